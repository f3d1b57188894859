use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::info;

use hicprune::allele_table::AlleleTable;
use hicprune::bam_io::{prune_bam, PruneOptions};

/// Prune allelic Hi-C contact evidence from a coordinate-sorted BAM
///
/// Read pairs linking contigs within one allele group, and all but the
/// best-supported link from a group to any external contig, are removed.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Allele contig table (Allele.ctg.table)
    #[clap(short = 'i', long = "table", value_name = "TABLE")]
    table: Option<PathBuf>,

    /// Coordinate-sorted BAM of Hi-C alignments
    #[clap(short = 'b', long = "bam", value_name = "BAM")]
    bam: Option<PathBuf>,

    /// Output BAM
    #[clap(short = 'o', long = "output", default_value = "pruned.bam")]
    output: PathBuf,

    /// Minimum MAPQ for a record to count as link evidence
    #[clap(short = 'q', long = "min-mapq", default_value = "0")]
    min_mapq: u8,

    /// BGZF codec threads for BAM reading and writing
    #[clap(short = 't', long = "threads", default_value = "1")]
    threads: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // An incomplete invocation prints the banner and exits cleanly.
    let (Some(table_path), Some(bam_path)) = (&args.table, &args.bam) else {
        Args::command().print_help()?;
        return Ok(());
    };

    let start = Instant::now();

    let table = AlleleTable::from_path(table_path)?;
    info!(
        "loaded {} allele group(s) from {}",
        table.num_groups(),
        table_path.display()
    );

    let opts = PruneOptions {
        min_mapq: args.min_mapq,
        threads: args.threads,
    };
    let report = prune_bam(bam_path, &table, &args.output, &opts)?;

    info!(
        "removed {} read(s), retained {}",
        report.stats.removed, report.stats.retained
    );
    info!("done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
