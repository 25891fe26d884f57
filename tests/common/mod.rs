#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use agscreen::command::exec::{ExecutionOutcome, Runner};
use agscreen::command::line::Invocation;
use agscreen::context::{RunContext, RunOptions};
use tempfile::TempDir;

/// Records invocations instead of spawning them; successful ones create their outputs
#[derive(Default)]
pub struct RecordingRunner {
    pub invocations: Vec<Invocation>,
    /// Fail the first invocation whose rendered command contains this text
    pub fail_when: Option<&'static str>,
    /// Succeed without writing any output
    pub produce_nothing: bool,
}

impl RecordingRunner {
    pub fn failing_on(needle: &'static str) -> Self {
        RecordingRunner { fail_when: Some(needle), ..Default::default() }
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations.iter().map(|inv| inv.program().to_string()).collect()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.invocations.iter().map(|inv| inv.to_string()).collect()
    }
}

impl Runner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<ExecutionOutcome> {
        self.invocations.push(invocation.clone());
        if let Some(needle) = self.fail_when {
            if invocation.to_string().contains(needle) {
                return Ok(ExecutionOutcome::Failure {
                    code: Some(1),
                    output: b"Error: tool exploded\nat line 2\n".to_vec(),
                });
            }
        }
        if !self.produce_nothing {
            let mut outputs: Vec<&PathBuf> = invocation.produces.iter().collect();
            outputs.extend(invocation.stdout.iter());
            for path in outputs {
                fs::write(path, format!("{}\n", invocation.program()))?;
            }
        }
        Ok(ExecutionOutcome::Success { output: b"10000 reads; of these:\n".to_vec() })
    }
}

/// Reads, library and output location of one sample in a temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub options: RunOptions,
}

impl Fixture {
    pub fn new() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let reads = dir.path().join("reads");
        let lib_dir = dir.path().join("lib");
        fs::create_dir_all(&reads).unwrap();
        fs::create_dir_all(&lib_dir).unwrap();

        let read1 = reads.join("S1_1.fastq.gz");
        let read2 = reads.join("S1_2.fastq.gz");
        let library = lib_dir.join("ags.fasta");
        fs::write(&read1, "@r1\nACGT\n+\nIIII\n").unwrap();
        fs::write(&read2, "@r1\nTGCA\n+\nIIII\n").unwrap();
        fs::write(&library, ">Ag1\nACGTACGT\n").unwrap();

        let options = RunOptions {
            read1,
            read2,
            library,
            out: dir.path().join("out"),
            log_name: "log.txt".to_string(),
            threads: 4,
            force: false,
            keep_tmp: false,
            dry_run: false,
        };
        Fixture { dir, options }
    }

    pub fn index_dir(&self) -> PathBuf {
        self.options.library.parent().unwrap().join("bowtie2_indices")
    }

    /// Pretend the index was built earlier
    pub fn with_index(self) -> Fixture {
        fs::create_dir_all(self.index_dir()).unwrap();
        fs::write(self.index_dir().join("aglib.1.bt2"), "index").unwrap();
        self
    }

    pub fn context(&self) -> RunContext {
        RunContext::create(self.options.clone()).unwrap()
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.options.out.join(name)
    }

    pub fn tmp(&self, name: &str) -> PathBuf {
        self.options.out.join("tmp").join(name)
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
