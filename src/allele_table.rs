//! Allele table loading and projection onto a BAM header.
//!
//! The table is the ALLHiC `Allele.ctg.table` layout: tab-separated lines
//! where the first two fields are the source-locus chromosome and position
//! (ignored here) and every remaining field is a contig identifier. All
//! contigs on one line form one allele group.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::PruneError;

/// Group identifier, dense from 0 in table order.
pub type GroupId = u32;

/// Contig identifier: the BAM header target index (tid).
pub type ContigId = u32;

/// Immutable grouping of contig names into allelic sets.
///
/// A contig belongs to at most one group; a table that lists a contig twice
/// fails to load.
#[derive(Debug, Default)]
pub struct AlleleTable {
    groups: Vec<Vec<String>>,
    group_of: HashMap<String, GroupId>,
}

impl AlleleTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PruneError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path)
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, PruneError> {
        let mut table = AlleleTable::default();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(parse_error(
                    source,
                    lineno + 1,
                    "expected chrom, pos and at least one contig",
                ));
            }

            // Fields 0-1 are the locus chromosome and position; the rest is
            // the group.
            let gid = table.groups.len() as GroupId;
            let mut members = Vec::with_capacity(fields.len() - 2);
            for name in &fields[2..] {
                if name.is_empty() {
                    continue;
                }
                if table.group_of.insert(name.to_string(), gid).is_some() {
                    return Err(parse_error(
                        source,
                        lineno + 1,
                        &format!("contig {name} listed in more than one allele group"),
                    ));
                }
                members.push(name.to_string());
            }
            if members.is_empty() {
                return Err(parse_error(source, lineno + 1, "group has no contigs"));
            }
            table.groups.push(members);
        }

        Ok(table)
    }

    /// Group of a contig name, if the table lists it. Contigs not listed are
    /// ungrouped singletons and never pruned against each other.
    pub fn group_of(&self, contig: &str) -> Option<GroupId> {
        self.group_of.get(contig).copied()
    }

    pub fn same_group(&self, a: &str, b: &str) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Bind the table to a concrete header's target-name list, producing the
    /// id-based view the pruning passes work with. Table contigs missing from
    /// the header are logged and skipped.
    pub fn project(&self, target_names: &[String]) -> ContigGroups {
        let mut group_by_contig = vec![None; target_names.len()];
        let mut members: Vec<Vec<ContigId>> = vec![Vec::new(); self.groups.len()];

        for (tid, name) in target_names.iter().enumerate() {
            if let Some(gid) = self.group_of(name) {
                group_by_contig[tid] = Some(gid);
                members[gid as usize].push(tid as ContigId);
            }
        }

        let listed: usize = members.iter().map(|m| m.len()).sum();
        if listed < self.group_of.len() {
            warn!(
                "{} allele-table contig(s) absent from the BAM header",
                self.group_of.len() - listed
            );
        }

        // Already ascending (tids assigned in header order), but make the
        // invariant explicit.
        for m in &mut members {
            m.sort_unstable();
        }

        ContigGroups {
            group_by_contig,
            members,
        }
    }
}

fn parse_error(path: &Path, line: usize, reason: &str) -> PruneError {
    PruneError::Parse {
        path: PathBuf::from(path),
        line,
        reason: reason.to_string(),
    }
}

/// AlleleTable projected onto one BAM header: per-tid group lookup plus
/// per-group sorted member lists. Immutable once built.
#[derive(Debug)]
pub struct ContigGroups {
    group_by_contig: Vec<Option<GroupId>>,
    members: Vec<Vec<ContigId>>,
}

impl ContigGroups {
    pub fn group_of(&self, contig: ContigId) -> Option<GroupId> {
        self.group_by_contig
            .get(contig as usize)
            .copied()
            .flatten()
    }

    pub fn same_group(&self, a: ContigId, b: ContigId) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    /// Member-id lists, ascending within each group.
    pub fn groups(&self) -> impl Iterator<Item = &[ContigId]> {
        self.members.iter().map(|m| m.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|m| m.is_empty())
    }
}
