use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the pruning pipeline. All of them are fatal: the run
/// aborts with no partial-output guarantee.
#[derive(Debug, Error)]
pub enum PruneError {
    /// Malformed or ambiguous allele table.
    #[error("allele table {path}: {reason} (line {line})")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Malformed or unsorted alignment source.
    #[error("alignment format: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BAM error: {0}")]
    Bam(#[from] rust_htslib::errors::Error),
}
