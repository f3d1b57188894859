// Library exports for hicprune
pub mod allele_table;
pub mod bam_io;
pub mod error;
pub mod pair_index;
pub mod prune;
pub mod rewrite;
