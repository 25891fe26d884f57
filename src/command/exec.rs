use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::command::line::Invocation;
use crate::error::PipelineError;
use crate::logging::RunLog;
use crate::stage::StageKind;

/// Result of running one invocation to completion
///
/// `output` is grouped by stream: the last process's stdout (unless redirected to a file), then
/// the stderr of each process in pipe order. Lines of different streams are not interleaved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every process exited 0
    Success { output: Vec<u8> },
    /// At least one process failed, `code` is the first non-zero exit code (None for a signal)
    Failure { code: Option<i32>, output: Vec<u8> },
}

/// Something that can run an invocation
///
/// [`ProcessRunner`] spawns real processes; tests substitute a recorder.
pub trait Runner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<ExecutionOutcome>;
}

impl<R: Runner + ?Sized> Runner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> io::Result<ExecutionOutcome> {
        (**self).run(invocation)
    }
}

/// Log the command, run it and turn a non-zero exit into a terminal error
///
/// Captured output of a failure is written to the run log line by line before the error is
/// returned, so the operator sees the tool's own diagnostics and not a summary.
pub fn execute<R: Runner + ?Sized>(
    runner: &mut R,
    stage: StageKind,
    invocation: &Invocation,
    log: &RunLog,
) -> Result<Vec<u8>, PipelineError> {
    log.info(&invocation.to_string());
    let outcome = runner
        .run(invocation)
        .map_err(|source| PipelineError::Exec { stage, source })?;

    match outcome {
        ExecutionOutcome::Success { output } => Ok(output),
        ExecutionOutcome::Failure { code, output } => {
            log.error_lines(&output);
            Err(PipelineError::StageFailed { stage, code, output })
        }
    }
}

/// Temporary name a redirected stdout is written to until the pipeline succeeds
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Runs invocations as child processes, connected with OS pipes
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<ExecutionOutcome> {
        let partial = invocation.stdout.as_deref().map(partial_path);
        let last = invocation.commands.len().saturating_sub(1);

        let mut children: Vec<Child> = Vec::with_capacity(invocation.commands.len());
        let mut stderr_drains: Vec<JoinHandle<io::Result<Vec<u8>>>> = Vec::new();
        let mut stdout_drain: Option<JoinHandle<io::Result<Vec<u8>>>> = None;
        let mut upstream: Option<Stdio> = None;

        for (i, line) in invocation.commands.iter().enumerate() {
            let mut cmd = Command::new(&line.program);
            cmd.args(&line.args);
            cmd.envs(line.env.iter().map(|(k, v)| (k, v)));
            if let Some(dir) = &invocation.dir {
                cmd.current_dir(dir);
            }
            cmd.stdin(upstream.take().unwrap_or_else(Stdio::null));
            cmd.stderr(Stdio::piped());
            match (&partial, i == last) {
                (Some(path), true) => match File::create(path) {
                    Ok(file) => cmd.stdout(file),
                    Err(err) => {
                        reap(&mut children);
                        return Err(io::Error::new(err.kind(), format!("{}: {}", path.display(), err)));
                    }
                },
                _ => cmd.stdout(Stdio::piped()),
            };

            debug!("Spawning {}", line.program);
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    reap(&mut children);
                    return Err(io::Error::new(err.kind(), format!("{}: {}", line.program, err)));
                }
            };

            if let Some(stderr) = child.stderr.take() {
                stderr_drains.push(drain(stderr));
            }
            if let Some(stdout) = child.stdout.take() {
                if i == last {
                    stdout_drain = Some(drain(stdout));
                } else {
                    upstream = Some(Stdio::from(stdout));
                }
            }
            children.push(child);
        }

        let mut code = None;
        let mut failed = false;
        for child in children.iter_mut() {
            let status = child.wait()?;
            if !status.success() && !failed {
                failed = true;
                code = status.code();
            }
        }

        let mut output = Vec::new();
        if let Some(handle) = stdout_drain {
            output.extend(join(handle)?);
        }
        for handle in stderr_drains {
            output.extend(join(handle)?);
        }

        if failed {
            return Ok(ExecutionOutcome::Failure { code, output });
        }
        if let (Some(partial), Some(target)) = (&partial, &invocation.stdout) {
            fs::rename(partial, target)?;
        }
        Ok(ExecutionOutcome::Success { output })
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn join(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output reader panicked"))?
}

/// Stop already started members of a pipeline whose later member could not be set up
fn reap(children: &mut [Child]) {
    for child in children.iter_mut() {
        let _ = child.kill();
        let _ = child.wait();
    }
}
