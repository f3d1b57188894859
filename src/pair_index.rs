//! First pass: aggregate inter-contig link counts from the alignment stream.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::allele_table::ContigId;
use crate::error::PruneError;

/// Minimal view of one alignment record, as seen by the pruning passes.
///
/// The concrete container record never enters the core; the BAM adapter maps
/// each record to its own contig, its mate's contig and a primary flag.
#[derive(Debug, Clone, Copy)]
pub struct LinkRecord {
    pub contig: Option<ContigId>,
    pub mate_contig: Option<ContigId>,
    pub primary: bool,
    pub mapq: u8,
}

impl LinkRecord {
    /// Canonical (min, max) contig pair, if both mates map to distinct
    /// contigs. Intra-contig pairs and unmapped mates yield `None`.
    pub fn pair(&self) -> Option<(ContigId, ContigId)> {
        match (self.contig, self.mate_contig) {
            (Some(a), Some(b)) if a != b => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }
}

/// Per-contig-pair link counts, built once from a single streaming pass and
/// immutable afterward.
///
/// Counting policy: primary alignments only, both mates mapped to distinct
/// contigs, and each read pair counted exactly once: from the mate whose own
/// contig id is the smaller one, since its mate record keys the same pair
/// from the other side and is skipped.
#[derive(Debug, Default)]
pub struct ContigPairIndex {
    counts: IndexMap<(ContigId, ContigId), u64>,
    partners: HashMap<ContigId, Vec<(ContigId, u64)>>,
}

impl ContigPairIndex {
    /// Consume the stream and aggregate. `min_mapq` is a counting floor:
    /// records below it contribute no evidence.
    pub fn build<I>(records: I, min_mapq: u8) -> Result<Self, PruneError>
    where
        I: IntoIterator<Item = Result<LinkRecord, PruneError>>,
    {
        let mut counts: IndexMap<(ContigId, ContigId), u64> = IndexMap::new();

        for record in records {
            let record = record?;
            if !record.primary || record.mapq < min_mapq {
                continue;
            }
            let Some((lo, hi)) = record.pair() else {
                continue;
            };
            // Count the pair from its lower-id mate only.
            if record.contig == Some(lo) {
                *counts.entry((lo, hi)).or_insert(0) += 1;
            }
        }

        let mut partners: HashMap<ContigId, Vec<(ContigId, u64)>> = HashMap::new();
        for (&(a, b), &n) in &counts {
            partners.entry(a).or_default().push((b, n));
            partners.entry(b).or_default().push((a, n));
        }
        // Descending by count, ascending by partner id on ties, so downstream
        // tie handling is deterministic.
        for list in partners.values_mut() {
            list.sort_unstable_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));
        }

        Ok(ContigPairIndex { counts, partners })
    }

    /// Read pairs linking `a` and `b` (order-insensitive).
    pub fn link_count(&self, a: ContigId, b: ContigId) -> u64 {
        self.counts
            .get(&(a.min(b), a.max(b)))
            .copied()
            .unwrap_or(0)
    }

    /// All partners of a contig with their link counts, best first.
    pub fn partners_of(&self, contig: ContigId) -> &[(ContigId, u64)] {
        self.partners
            .get(&contig)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Indexed pairs in first-seen stream order.
    pub fn pairs(&self) -> impl Iterator<Item = ((ContigId, ContigId), u64)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
