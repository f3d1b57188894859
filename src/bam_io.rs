//! rust-htslib adapter: binds the container-agnostic core to BAM files and
//! drives the whole pipeline.

use std::path::Path;

use log::{info, warn};
use rust_htslib::bam::{self, Format, Header, HeaderView, Read};

use crate::allele_table::{AlleleTable, ContigId};
use crate::error::PruneError;
use crate::pair_index::{ContigPairIndex, LinkRecord};
use crate::prune::{decide, RemovalSet};
use crate::rewrite::{rewrite, RewriteStats};

#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    /// Counting floor: records below this MAPQ contribute no link evidence.
    pub min_mapq: u8,
    /// BGZF codec threads for reader and writer. Record order is unaffected.
    pub threads: usize,
}

impl Default for PruneOptions {
    fn default() -> Self {
        PruneOptions {
            min_mapq: 0,
            threads: 1,
        }
    }
}

/// What a run did, for reporting.
#[derive(Debug, Clone, Copy)]
pub struct PruneReport {
    pub pairs_indexed: usize,
    pub pairs_removed: usize,
    pub stats: RewriteStats,
}

/// Run the full pipeline: project the table onto the BAM header, count
/// contig-pair links (pass 1), decide removals, and write the pruned BAM
/// (pass 2). The input is read twice and never mutated.
pub fn prune_bam(
    input: &Path,
    table: &AlleleTable,
    output: &Path,
    opts: &PruneOptions,
) -> Result<PruneReport, PruneError> {
    let mut reader = open_reader(input, opts)?;
    check_sort_order(reader.header())?;
    let names = target_names(reader.header());
    let groups = table.project(&names);

    info!("pass 1: indexing contig pairs from {}", input.display());
    let index = ContigPairIndex::build(
        reader
            .records()
            .map(|r| r.map(|rec| link_of(&rec)).map_err(PruneError::from)),
        opts.min_mapq,
    )?;
    info!("indexed {} inter-contig pair(s)", index.len());

    let removal = decide(&groups, &index);
    info!("flagged {} pair(s) for removal", removal.len());

    let mut reader = open_reader(input, opts)?;
    let header = Header::from_template(reader.header());
    let mut writer = bam::Writer::from_path(output, &header, Format::Bam)?;
    if opts.threads > 1 {
        writer.set_threads(opts.threads)?;
    }

    info!("pass 2: writing pruned BAM to {}", output.display());
    let stats = write_pruned(&mut reader, &mut writer, &removal)?;

    Ok(PruneReport {
        pairs_indexed: index.len(),
        pairs_removed: removal.len(),
        stats,
    })
}

/// Pass 2 only: stream every record, dropping those whose contig pair is
/// flagged, preserving order and header.
pub fn write_pruned(
    reader: &mut bam::Reader,
    writer: &mut bam::Writer,
    removal: &RemovalSet,
) -> Result<RewriteStats, PruneError> {
    rewrite(
        reader.records().map(|r| r.map_err(PruneError::from)),
        |rec: &bam::Record| link_of(rec).pair(),
        removal,
        |rec| writer.write(&rec).map_err(PruneError::from),
    )
}

fn open_reader(path: &Path, opts: &PruneOptions) -> Result<bam::Reader, PruneError> {
    let mut reader = bam::Reader::from_path(path)?;
    if opts.threads > 1 {
        reader.set_threads(opts.threads)?;
    }
    Ok(reader)
}

/// Target names in tid order; tid is the core's ContigId.
pub fn target_names(header: &HeaderView) -> Vec<String> {
    header
        .target_names()
        .iter()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

fn link_of(rec: &bam::Record) -> LinkRecord {
    LinkRecord {
        contig: id_of(rec.tid()),
        mate_contig: id_of(rec.mtid()),
        primary: !rec.is_secondary() && !rec.is_supplementary(),
        mapq: rec.mapq(),
    }
}

fn id_of(tid: i32) -> Option<ContigId> {
    (tid >= 0).then_some(tid as ContigId)
}

/// An explicit non-coordinate sort order is fatal; a missing SO tag only
/// warns, since many sorted BAMs omit it.
fn check_sort_order(header: &HeaderView) -> Result<(), PruneError> {
    let text = Header::from_template(header).to_bytes();
    let text = String::from_utf8_lossy(&text);
    match sort_order_of(&text) {
        Some(so) if so != "coordinate" => Err(PruneError::Format(format!(
            "input BAM is {so}-sorted; coordinate sort required"
        ))),
        Some(_) => Ok(()),
        None => {
            warn!("BAM header carries no SO tag; assuming coordinate sort");
            Ok(())
        }
    }
}

fn sort_order_of(header_text: &str) -> Option<&str> {
    let hd = header_text.lines().find(|l| l.starts_with("@HD"))?;
    hd.split('\t').find_map(|f| f.strip_prefix("SO:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parsing() {
        assert_eq!(
            sort_order_of("@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:ctgA\tLN:100\n"),
            Some("coordinate")
        );
        assert_eq!(
            sort_order_of("@HD\tVN:1.6\tSO:queryname\n"),
            Some("queryname")
        );
        assert_eq!(sort_order_of("@HD\tVN:1.6\n"), None);
        assert_eq!(sort_order_of("@SQ\tSN:ctgA\tLN:100\n"), None);
    }

    #[test]
    fn tid_mapping() {
        assert_eq!(id_of(-1), None);
        assert_eq!(id_of(0), Some(0));
        assert_eq!(id_of(7), Some(7));
    }
}
