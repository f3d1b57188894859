//! Second pass: apply the removal decision to the alignment stream.

use crate::allele_table::ContigId;
use crate::error::PruneError;
use crate::prune::RemovalSet;

/// Outcome of a rewrite pass, in individual alignment records (mates), not
/// read pairs. `removed + retained` always equals the input record count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub removed: u64,
    pub retained: u64,
}

impl RewriteStats {
    pub fn total(&self) -> u64 {
        self.removed + self.retained
    }
}

/// Stream `records` through the removal filter in original order.
///
/// `pair_of` keys a record by the canonical contig pair of its mates, `None`
/// for intra-contig pairs and unmapped mates (those always pass). Both mates
/// of a read pair key the same canonical pair, so a flagged pair loses both
/// mates and an unflagged one keeps both, never half a pair. Retained
/// records reach `emit` unmodified; the source is never mutated.
pub fn rewrite<T, I, K, E>(
    records: I,
    pair_of: K,
    removal: &RemovalSet,
    mut emit: E,
) -> Result<RewriteStats, PruneError>
where
    I: IntoIterator<Item = Result<T, PruneError>>,
    K: Fn(&T) -> Option<(ContigId, ContigId)>,
    E: FnMut(T) -> Result<(), PruneError>,
{
    let mut stats = RewriteStats::default();

    for record in records {
        let record = record?;
        let drop = pair_of(&record).is_some_and(|(a, b)| removal.contains(a, b));
        if drop {
            stats.removed += 1;
        } else {
            emit(record)?;
            stats.retained += 1;
        }
    }

    Ok(stats)
}
