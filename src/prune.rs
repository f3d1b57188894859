//! Decision engine: which contig-pair links are ambiguous and must go.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::allele_table::{ContigGroups, ContigId};
use crate::pair_index::ContigPairIndex;

/// Contig pairs flagged for removal, canonical (min, max) keys. Built once
/// per run, read-only in the rewrite pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RemovalSet {
    pairs: HashSet<(ContigId, ContigId)>,
}

impl RemovalSet {
    pub fn insert(&mut self, a: ContigId, b: ContigId) {
        self.pairs.insert((a.min(b), a.max(b)));
    }

    pub fn contains(&self, a: ContigId, b: ContigId) -> bool {
        self.pairs.contains(&(a.min(b), a.max(b)))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContigId, ContigId)> + '_ {
        self.pairs.iter().copied()
    }
}

/// Compute the removal set. Pure function of its inputs: identical inputs
/// always yield the identical set, regardless of map iteration order.
///
/// Two rules per allele group G:
/// 1. intra-group: any indexed pair with both members in G is removed;
///    contact between homologous contigs is expected artifact, not adjacency;
/// 2. cross-group ambiguity: for each external partner P, only the sibling in
///    G with the most link evidence to P keeps its link; ties go to the
///    numerically smallest sibling id. Every other sibling–P link is removed.
pub fn decide(groups: &ContigGroups, index: &ContigPairIndex) -> RemovalSet {
    let mut removal = RemovalSet::default();

    // Rule 1.
    for ((a, b), _) in index.pairs() {
        if groups.same_group(a, b) {
            removal.insert(a, b);
        }
    }

    // Rule 2. Two sweeps per group: elect the best sibling per partner, then
    // flag every losing sibling-partner link.
    for members in groups.groups() {
        if members.len() < 2 {
            continue;
        }

        let mut best: BTreeMap<ContigId, (u64, ContigId)> = BTreeMap::new();
        for &sib in members {
            for &(partner, count) in index.partners_of(sib) {
                if groups.same_group(sib, partner) {
                    continue;
                }
                let wins = match best.get(&partner) {
                    None => true,
                    Some(&(bc, bs)) => count > bc || (count == bc && sib < bs),
                };
                if wins {
                    best.insert(partner, (count, sib));
                }
            }
        }

        for &sib in members {
            for &(partner, _) in index.partners_of(sib) {
                if groups.same_group(sib, partner) {
                    continue;
                }
                if let Some(&(_, winner)) = best.get(&partner) {
                    if winner != sib {
                        removal.insert(sib, partner);
                    }
                }
            }
        }
    }

    debug!("flagged {} contig pair(s) for removal", removal.len());
    removal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allele_table::AlleleTable;
    use crate::error::PruneError;
    use crate::pair_index::LinkRecord;
    use std::io::Cursor;
    use std::path::Path;

    fn groups_from(table: &str, names: &[&str]) -> ContigGroups {
        let table =
            AlleleTable::from_reader(Cursor::new(table), Path::new("test.table")).unwrap();
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        table.project(&names)
    }

    fn index_from(pairs: &[(u32, u32, u64)]) -> ContigPairIndex {
        let mut records: Vec<Result<LinkRecord, PruneError>> = Vec::new();
        for &(a, b, n) in pairs {
            for _ in 0..n {
                for (c, m) in [(a, b), (b, a)] {
                    records.push(Ok(LinkRecord {
                        contig: Some(c),
                        mate_contig: Some(m),
                        primary: true,
                        mapq: 60,
                    }));
                }
            }
        }
        ContigPairIndex::build(records, 0).unwrap()
    }

    // tids: A=0, B=1, C=2.
    const NAMES: &[&str] = &["A", "B", "C"];

    #[test]
    fn reference_scenario() {
        // Group {A,B}, partner C; counts A-C=10, B-C=4, A-B=7.
        let groups = groups_from("Chr1\t1\tA\tB\n", NAMES);
        let index = index_from(&[(0, 2, 10), (1, 2, 4), (0, 1, 7)]);
        let removal = decide(&groups, &index);

        assert!(removal.contains(0, 1), "intra-group pair must go");
        assert!(removal.contains(1, 2), "weaker sibling link must go");
        assert!(!removal.contains(0, 2), "best link must survive");
        assert_eq!(removal.len(), 2);
    }

    #[test]
    fn tie_breaks_to_smallest_id() {
        let groups = groups_from("Chr1\t1\tA\tB\n", NAMES);
        let index = index_from(&[(0, 2, 5), (1, 2, 5)]);
        let removal = decide(&groups, &index);
        assert!(!removal.contains(0, 2));
        assert!(removal.contains(1, 2));
    }

    #[test]
    fn decisions_independent_per_partner() {
        // A beats B for C, B beats A for D: each sibling keeps one link.
        let names = &["A", "B", "C", "D"];
        let groups = groups_from("Chr1\t1\tA\tB\n", names);
        let index = index_from(&[(0, 2, 9), (1, 2, 3), (0, 3, 2), (1, 3, 8)]);
        let removal = decide(&groups, &index);
        assert!(!removal.contains(0, 2));
        assert!(removal.contains(1, 2));
        assert!(removal.contains(0, 3));
        assert!(!removal.contains(1, 3));
    }

    #[test]
    fn links_between_two_groups_pruned_from_both_sides() {
        // {A,B} and {C,D}; links A-C=6, A-D=2, B-C=1.
        // From {A,B}: A wins C (B-C removed), A keeps D.
        // From {C,D}: C wins A (A-D removed).
        let names = &["A", "B", "C", "D"];
        let groups = groups_from("Chr1\t1\tA\tB\nChr2\t1\tC\tD\n", names);
        let index = index_from(&[(0, 2, 6), (0, 3, 2), (1, 2, 1)]);
        let removal = decide(&groups, &index);
        assert!(!removal.contains(0, 2));
        assert!(removal.contains(1, 2));
        assert!(removal.contains(0, 3));
        assert_eq!(removal.len(), 2);
    }

    #[test]
    fn ungrouped_contigs_never_pruned() {
        // C and D are absent from the table: their link is untouchable.
        let names = &["A", "B", "C", "D"];
        let groups = groups_from("Chr1\t1\tA\tB\n", names);
        let index = index_from(&[(2, 3, 4)]);
        assert!(decide(&groups, &index).is_empty());
    }

    #[test]
    fn empty_table_flags_nothing() {
        let groups = groups_from("", NAMES);
        let index = index_from(&[(0, 1, 7), (0, 2, 3)]);
        assert!(decide(&groups, &index).is_empty());
    }

    #[test]
    fn idempotent_on_identical_inputs() {
        let groups = groups_from("Chr1\t1\tA\tB\n", NAMES);
        let index = index_from(&[(0, 2, 10), (1, 2, 4), (0, 1, 7)]);
        let first = decide(&groups, &index);
        let second = decide(&groups, &index);
        assert_eq!(first, second);
    }
}
