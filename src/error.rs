use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stage::StageKind;

/// Problems with inputs or settings, detected before any stage runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("can't read config file {}: {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse { path: PathBuf, source: serde_json::Error },
    #[error("can't resolve the current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("thread count must be at least 1")]
    Threads,
    #[error("can't create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("can't open log file {}: {source}", .path.display())]
    LogFile { path: PathBuf, source: io::Error },
}

/// Terminal failures of a sample run or an index build
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed with {}, see log for captured tool output", describe_exit(.code))]
    StageFailed { stage: StageKind, code: Option<i32>, output: Vec<u8> },
    #[error("{stage}: can't run command: {source}")]
    Exec { stage: StageKind, source: io::Error },
    #[error("{stage}: expected input {} is missing", .path.display())]
    MissingPredecessor { stage: StageKind, path: PathBuf },
    #[error("{stage} exited 0 but did not produce {}", .path.display())]
    MissingArtifact { stage: StageKind, path: PathBuf },
    #[error("bowtie2 index not found at {}: build the index first with agscreen-index", .path.display())]
    IndexMissing { path: PathBuf },
    #[error("index build already in progress (lock file {} exists)", .path.display())]
    IndexLocked { path: PathBuf },
    #[error("{stage}: filesystem error on {}: {source}", .path.display())]
    Io { stage: StageKind, path: PathBuf, source: io::Error },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Fatal aggregation errors, per-line problems are only warned about
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("directory '{}' not found", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Ag library file '{}' not found", .0.display())]
    LibraryNotFound(PathBuf),
    #[error("no Ag IDs found in library file '{}'", .0.display())]
    EmptyLibrary(PathBuf),
    #[error("no .counts or .counts.txt files found in '{}'", .0.display())]
    NoCountFiles(PathBuf),
    #[error("can't read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("can't write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
