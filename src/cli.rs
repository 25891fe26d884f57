//! Command line arguments of the three tools

use std::path::PathBuf;

use clap::Parser;

use crate::backend::BackendKind;
use crate::context::RunOptions;

/// Bowtie2 indexing of an Ag library
#[derive(Debug, Parser)]
#[command(version)]
pub struct IndexArgs {
    /// fasta file containing library Ag sequences
    pub library: PathBuf,

    /// Name of the log file, written as indexing_<name> next to the index
    #[arg(short, long, default_value = "log.txt")]
    pub log: String,

    /// Run tools from the host PATH or from container images
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// JSON configuration file (backend, runtime, images)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Ag library screen processing of one paired-end sample
#[derive(Debug, Parser)]
#[command(version)]
pub struct CountArgs {
    /// fastq(.gz) read 1, the sample name is taken from it
    pub read1: PathBuf,

    /// fastq(.gz) read 2
    pub read2: PathBuf,

    /// fasta file containing library Ag sequences
    pub library: PathBuf,

    /// Name of the log file, written as <sample>_<name> in the output directory
    #[arg(short, long, default_value = "log.txt")]
    pub log: String,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    pub out: PathBuf,

    /// Number of threads for the steps that support it
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: u32,

    /// Run tools from the host PATH or from container images
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// JSON configuration file (backend, runtime, images)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Re-run every stage even when its output exists
    #[arg(short, long)]
    pub force: bool,

    /// Keep intermediate fastp outputs once cutadapt has consumed them
    #[arg(long)]
    pub keep_tmp: bool,

    /// Log the commands that would run without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl CountArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            read1: self.read1.clone(),
            read2: self.read2.clone(),
            library: self.library.clone(),
            out: self.out.clone(),
            log_name: self.log.clone(),
            threads: self.threads,
            force: self.force,
            keep_tmp: self.keep_tmp,
            dry_run: self.dry_run,
        }
    }
}

/// Join counts from multiple samples into a single table
#[derive(Debug, Parser)]
#[command(version)]
pub struct JoinArgs {
    /// Directory holding the <sample>.counts.txt (or .counts) files
    pub counts_dir: PathBuf,

    /// Ag library table, first column is the Ag ID
    pub library: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definitions_are_consistent() {
        IndexArgs::command().debug_assert();
        CountArgs::command().debug_assert();
        JoinArgs::command().debug_assert();
    }

    #[test]
    fn count_defaults() {
        let args = CountArgs::try_parse_from(["agscreen-count", "a_1.fq", "a_2.fq", "lib.fa"]).unwrap();
        assert_eq!(args.log, "log.txt");
        assert_eq!(args.out, PathBuf::from("out"));
        assert_eq!(args.threads, 4);
        assert_eq!(args.backend, None);
        assert!(!args.force && !args.keep_tmp && !args.dry_run);
    }

    #[test]
    fn count_rejects_zero_threads_and_parses_backend() {
        assert!(CountArgs::try_parse_from(["agscreen-count", "a", "b", "c", "-t", "0"]).is_err());
        let args = CountArgs::try_parse_from(["agscreen-count", "a", "b", "c", "--backend", "container"]).unwrap();
        assert_eq!(args.backend, Some(BackendKind::Container));
    }
}
