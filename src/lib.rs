//! Processing of antigen library screens
//!
//! A sample run takes paired-end reads through UMI extraction and deduplication (fastp),
//! removal of the shared 5' flanks (cutadapt), alignment to the library (bowtie2) and a per-Ag
//! tally (samtools + coreutils). The index of the library is built separately, once, and count
//! tables of many samples are joined into one matrix afterwards.

/// Joining of per-sample count files
pub mod aggregate;
/// Native and containerized command construction
pub mod backend;
pub mod cli;
/// Typed command lines and the executor
pub mod command;
pub mod config;
pub mod context;
pub mod error;
/// Shared bowtie2 index of the library
pub mod index;
pub mod logging;
/// Stage sequencing and resume
pub mod pipeline;
pub mod sample;
pub mod stage;
