//! Bowtie2 index of the antigen library
//!
//! The index is built once, next to the library, and shared read-only by every sample run.
//! Builds hold an exclusive lock file and write under a private prefix, then rename onto the
//! shared `aglib` prefix with the marker file last. A reader that sees the marker therefore
//! always sees a complete index.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, warn};

use crate::backend::tool::{Tool, ToolCall};
use crate::backend::ExecutionBackend;
use crate::command::exec::{execute, Runner};
use crate::error::PipelineError;
use crate::logging::RunLog;
use crate::stage::{Stage, StageKind};

static INDEX_DIR: &str = "bowtie2_indices";
static INDEX_NAME: &str = "aglib";
static MARKER_SUFFIX: &str = ".1.bt2";

/// Where the index of a library lives: `<library dir>/bowtie2_indices/aglib.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    pub dir: PathBuf,
    /// Basename passed to bowtie2 `-x`
    pub prefix: PathBuf,
}

impl IndexLayout {
    pub fn for_library(library: &Path) -> Self {
        let dir = library.parent().unwrap_or_else(|| Path::new("/")).join(INDEX_DIR);
        let prefix = dir.join(INDEX_NAME);
        IndexLayout { dir, prefix }
    }

    /// First file bowtie2-build writes; its presence means the index exists
    pub fn marker(&self) -> PathBuf {
        self.dir.join(format!("{INDEX_NAME}{MARKER_SUFFIX}"))
    }

    pub fn exists(&self) -> bool {
        self.marker().exists()
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{INDEX_NAME}.lock"))
    }

    /// Private name used while building, unique per process
    fn partial_name(&self) -> String {
        format!("{INDEX_NAME}.partial-{}", process::id())
    }

    /// Log file of the index build, `indexing_<log name>`
    pub fn log_path(&self, log_name: &str) -> PathBuf {
        self.dir.join(format!("indexing_{log_name}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Marker found, nothing was run
    Present,
    Built,
}

/// Exclusive claim on building one index, released on drop
struct IndexLock {
    path: PathBuf,
}

impl IndexLock {
    fn acquire(layout: &IndexLayout) -> Result<IndexLock, PipelineError> {
        let path = layout.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(IndexLock { path }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(PipelineError::IndexLocked { path })
            }
            Err(source) => Err(PipelineError::Io { stage: StageKind::IndexBuild, path, source }),
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Can't remove index lock {}: {}", self.path.display(), err);
        }
    }
}

/// Build the index of `library` unless it already exists
///
/// `layout.dir` has to exist, the caller creates it before opening the index log inside it.
pub fn build_index<R: Runner + ?Sized>(
    library: &Path,
    layout: &IndexLayout,
    backend: &dyn ExecutionBackend,
    runner: &mut R,
    log: &RunLog,
) -> Result<IndexStatus, PipelineError> {
    if layout.exists() {
        debug!("Index marker {} found, skipping build", layout.marker().display());
        return Ok(IndexStatus::Present);
    }

    let _lock = IndexLock::acquire(layout)?;
    // another build may have finished between the check and the lock
    if layout.exists() {
        return Ok(IndexStatus::Present);
    }

    let partial = layout.partial_name();
    let partial_prefix = layout.dir.join(&partial);
    let stage = Stage::new(StageKind::IndexBuild, layout.dir.join(format!("{partial}{MARKER_SUFFIX}")))
        .after(library)
        .tool(ToolCall::new(Tool::Bowtie2Build).path(library).path(&partial_prefix));

    if let Some(path) = stage.predecessors.iter().find(|p| !p.exists()) {
        return Err(PipelineError::MissingPredecessor { stage: StageKind::IndexBuild, path: path.clone() });
    }

    log.info(StageKind::IndexBuild.banner());
    let invocation = stage.invocation(backend, &layout.dir);
    execute(runner, StageKind::IndexBuild, &invocation, log)?;
    if !stage.artifact.exists() {
        return Err(PipelineError::MissingArtifact { stage: StageKind::IndexBuild, path: stage.artifact });
    }

    publish(layout, &partial)?;
    log.info(&format!("Index written to {}", layout.prefix.display()));
    Ok(IndexStatus::Built)
}

/// Rename `<partial>.*` onto `aglib.*`, marker last
fn publish(layout: &IndexLayout, partial: &str) -> Result<(), PipelineError> {
    let io_err = |path: &Path, source: io::Error| PipelineError::Io {
        stage: StageKind::IndexBuild,
        path: path.to_path_buf(),
        source,
    };

    let entries = fs::read_dir(&layout.dir).map_err(|e| io_err(&layout.dir, e))?;
    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_err(&layout.dir, e))?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if let Some(rest) = name.strip_prefix(partial) {
            files.push((path.clone(), layout.dir.join(format!("{INDEX_NAME}{rest}"))));
        }
    }

    let marker = layout.marker();
    files.sort_by_key(|(_, target)| *target == marker);
    for (from, to) in files {
        debug!("Renaming {} to {}", from.display(), to.display());
        fs::rename(&from, &to).map_err(|e| io_err(&from, e))?;
    }
    Ok(())
}
