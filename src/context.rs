use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::ConfigError;
use crate::index::IndexLayout;
use crate::logging::RunLog;
use crate::sample::sample_name;

/// Everything a sample run is started with
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub read1: PathBuf,
    pub read2: PathBuf,
    pub library: PathBuf,
    /// Output directory, relative paths are taken from the current directory
    pub out: PathBuf,
    /// Log file name, prefixed with the sample name inside the output directory
    pub log_name: String,
    pub threads: u32,
    /// Re-run every stage even if its artifact exists
    pub force: bool,
    /// Keep intermediate trim outputs once they are consumed
    pub keep_tmp: bool,
    /// Log the commands without running them
    pub dry_run: bool,
}

/// State of one sample run, fixed once created
///
/// Creating the context validates the inputs, creates the output and tmp directories when they
/// are missing and opens the run log. Nothing is mutated afterwards.
pub struct RunContext {
    pub sample: String,
    pub read1: PathBuf,
    pub read2: PathBuf,
    pub library: PathBuf,
    pub out_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub index: IndexLayout,
    pub threads: u32,
    pub force: bool,
    pub keep_tmp: bool,
    pub dry_run: bool,
    log: RunLog,
}

impl RunContext {
    pub fn create(options: RunOptions) -> Result<RunContext, ConfigError> {
        let read1 = existing_file(&options.read1)?;
        let read2 = existing_file(&options.read2)?;
        let library = existing_file(&options.library)?;
        if options.threads == 0 {
            return Err(ConfigError::Threads);
        }

        let sample = sample_name(&read1);
        let out_dir = absolute(&options.out)?;
        let tmp_dir = out_dir.join("tmp");
        create_dir(&out_dir)?;
        create_dir(&tmp_dir)?;

        let log = RunLog::open(&out_dir.join(format!("{}_{}", sample, options.log_name)))?;
        info!("Sample {} writing to {}", sample, out_dir.display());

        Ok(RunContext {
            sample,
            read1,
            read2,
            index: IndexLayout::for_library(&library),
            library,
            out_dir,
            tmp_dir,
            threads: options.threads,
            force: options.force,
            keep_tmp: options.keep_tmp,
            dry_run: options.dry_run,
            log,
        })
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Path of a per-sample artifact in the output directory, e.g. `<out>/<sample>.sam`
    pub fn out_file(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}{}", self.sample, suffix))
    }

    /// Path of a per-sample intermediate in the tmp directory
    pub fn tmp_file(&self, suffix: &str) -> PathBuf {
        self.tmp_dir.join(format!("{}{}", self.sample, suffix))
    }
}

/// Make `path` absolute against the current directory without touching the filesystem
pub fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.is_absolute() {
        true => Ok(path.to_path_buf()),
        false => Ok(env::current_dir().map_err(ConfigError::CurrentDir)?.join(path)),
    }
}

fn existing_file(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.is_file() {
        true => absolute(path),
        false => Err(ConfigError::MissingInput(path.to_path_buf())),
    }
}

/// Create a directory unless it already exists
pub fn create_dir(path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        return Ok(());
    }
    info!("Creating directory {}", path.display());
    fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir { path: path.to_path_buf(), source })
}
