//! Stages of a sample run
//!
//! A stage is known by the artifact it leaves behind. That file existing *is* the completion
//! marker, there is no separate state file.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::tool::{Tool, ToolCall};
use crate::backend::ExecutionBackend;
use crate::command::line::{CommandLine, Invocation};
use crate::context::RunContext;
use crate::sample::read_stem;

/// 5' sequence shared by every read 1, trimmed as an internal adapter (staggered by 0-3 N)
static READ1_FLANK: &str = "CGCTCAGCCTCGAGGTTT";
/// 5' sequence shared by every read 2 once the 16 nt UMI is extracted
static READ2_FLANK: &str = "GCTGCGGAATTCGCGTTT";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    IndexBuild,
    TrimDedup,
    AdapterTrim,
    Align,
    Tally,
}

impl StageKind {
    /// Header written to the run log when the stage starts
    pub fn banner(&self) -> &'static str {
        match self {
            StageKind::IndexBuild => "****** Bowtie2: library fasta indexing ******",
            StageKind::TrimDedup => "****** Fastp: umi extraction + dedup + qc ******",
            StageKind::AdapterTrim => "****** Cutadapt: trimming of shared sequences in 5' of each read ******",
            StageKind::Align => "****** Bowtie2: fastq alignment to library ******",
            StageKind::Tally => "****** Computing counts for each candidate Ag ******",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StageKind::IndexBuild => write!(f, "index-build"),
            StageKind::TrimDedup => write!(f, "trim-dedup"),
            StageKind::AdapterTrim => write!(f, "adapter-trim"),
            StageKind::Align => write!(f, "align"),
            StageKind::Tally => write!(f, "tally"),
        }
    }
}

/// One process of a stage's pipe
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Wrapped tool, realized by the run's backend
    Tool(ToolCall),
    /// Plain host utility (cut, sort, ...)
    Host(CommandLine),
}

#[derive(Clone, Debug)]
pub struct Stage {
    pub kind: StageKind,
    /// Expected output; its existence means the stage is done
    pub artifact: PathBuf,
    /// Artifacts of earlier stages this one reads
    pub predecessors: Vec<PathBuf>,
    pub steps: Vec<Step>,
    /// Redirect the stdout of the last step here
    pub stdout: Option<PathBuf>,
    /// Intermediates that may be deleted once this stage succeeded
    pub consumes: Vec<PathBuf>,
    /// Copy the captured tool output into the run log on success
    pub log_output: bool,
    /// Index marker that has to exist before the stage may run
    pub requires_index: Option<PathBuf>,
}

impl Stage {
    pub fn new(kind: StageKind, artifact: PathBuf) -> Self {
        Stage {
            kind,
            artifact,
            predecessors: Vec::new(),
            steps: Vec::new(),
            stdout: None,
            consumes: Vec::new(),
            log_output: false,
            requires_index: None,
        }
    }

    pub fn after(mut self, path: &Path) -> Self {
        self.predecessors.push(path.to_path_buf());
        self
    }

    pub fn tool(mut self, call: ToolCall) -> Self {
        self.steps.push(Step::Tool(call));
        self
    }

    pub fn host(mut self, line: CommandLine) -> Self {
        self.steps.push(Step::Host(line));
        self
    }

    /// Send stdout of the last step to the stage artifact
    pub fn stdout_to_artifact(mut self) -> Self {
        self.stdout = Some(self.artifact.clone());
        self
    }

    pub fn consumes(mut self, path: &Path) -> Self {
        self.consumes.push(path.to_path_buf());
        self
    }

    pub fn log_output(mut self) -> Self {
        self.log_output = true;
        self
    }

    pub fn requires_index(mut self, marker: &Path) -> Self {
        self.requires_index = Some(marker.to_path_buf());
        self
    }

    /// Concrete command for this stage under `backend`
    pub fn invocation(&self, backend: &dyn ExecutionBackend, dir: &Path) -> Invocation {
        let mut commands = self.steps.iter().map(|step| match step {
            Step::Tool(call) => backend.realize(call),
            Step::Host(line) => line.clone(),
        });
        // stages always have at least one step
        let mut invocation = match commands.next() {
            Some(first) => Invocation::new(first),
            None => Invocation::new(CommandLine::new("true")),
        };
        for command in commands {
            invocation = invocation.pipe(command);
        }
        if let Some(path) = &self.stdout {
            invocation = invocation.stdout_to(path);
        }
        invocation.in_dir(dir).produces(&self.artifact)
    }
}

/// The four stages of a sample run, in execution order
pub fn sample_stages(ctx: &RunContext) -> Vec<Stage> {
    let threads = ctx.threads.to_string();

    let trim_r1 = ctx.tmp_dir.join(format!("{}.r1.fastp.fq", read_stem(&ctx.read1)));
    let trim_r2 = ctx.tmp_dir.join(format!("{}.r2.fastp.fq", read_stem(&ctx.read2)));
    let clipped_r1 = ctx.tmp_file(".out.1.fastq");
    let clipped_r2 = ctx.tmp_file(".out.2.fastq");
    let sam = ctx.out_file(".sam");
    let counts = ctx.out_file(".counts.txt");

    // adapter trimming is disabled, it does not work on these constructs
    let trim = Stage::new(StageKind::TrimDedup, trim_r1.clone())
        .after(&ctx.read1)
        .after(&ctx.read2)
        .tool(
            ToolCall::new(Tool::Fastp)
                .opt_path("-i", &ctx.read1)
                .opt_path("-I", &ctx.read2)
                .opt_path("-o", &trim_r1)
                .opt_path("-O", &trim_r2)
                .flag("--disable_adapter_trimming")
                .flags(["--length_required", "100"])
                .flag("--umi")
                .flags(["--umi_len", "16"])
                .flags(["--umi_loc", "read2"])
                .flags(["--umi_prefix", "UMI"])
                .flag("--dedup")
                .opt_path("-h", &ctx.out_file(".fastp.html"))
                .opt_path("-j", &ctx.out_file(".fastp.json")),
        );

    let adapter = Stage::new(StageKind::AdapterTrim, clipped_r1.clone())
        .after(&trim_r1)
        .after(&trim_r2)
        .tool(
            ToolCall::new(Tool::Cutadapt)
                .flags(["-g", READ1_FLANK])
                .flags(["-G", READ2_FLANK])
                .opt_path("-o", &clipped_r1)
                .opt_path("-p", &clipped_r2)
                .path(&trim_r1)
                .path(&trim_r2)
                .flag(format!("--cores={}", threads)),
        )
        .consumes(&trim_r1)
        .consumes(&trim_r2)
        .log_output();

    // --dovetail: mates extending past each other are still concordant
    let align = Stage::new(StageKind::Align, sam.clone())
        .after(&clipped_r1)
        .after(&clipped_r2)
        .requires_index(&ctx.index.marker())
        .tool(
            ToolCall::new(Tool::Bowtie2)
                .flags(["-p", threads.as_str()])
                .flags(["-N", "0"])
                .flag("--no-1mm-upfront")
                .flag("-q")
                .opt_path("-1", &clipped_r1)
                .opt_path("-2", &clipped_r2)
                .flag("--no-unal")
                .opt_path("-x", &ctx.index.prefix)
                .flag("--dovetail"),
        )
        .stdout_to_artifact()
        .log_output();

    // -F 0x80 drops read 2 so each pair is counted once
    let tally = Stage::new(StageKind::Tally, counts)
        .after(&sam)
        .tool(ToolCall::new(Tool::Samtools).flag("view").flags(["-F", "0x80"]).path(&sam))
        .host(CommandLine::new("cut").args(["-f", "3"]))
        .host(CommandLine::new("sort").env("LC_ALL", "C"))
        .host(CommandLine::new("uniq").arg("-c"))
        .host(CommandLine::new("awk").arg(r#"{printf("%s\t%s\n", $2, $1)}"#))
        .stdout_to_artifact();

    vec![trim, adapter, align, tally]
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::backend::native::NativeBackend;
    use crate::context::RunOptions;

    fn context(dir: &Path) -> RunContext {
        let library = dir.join("lib").join("ags.fasta");
        fs::create_dir_all(library.parent().unwrap()).unwrap();
        for path in [dir.join("S1_1.fastq.gz"), dir.join("S1_2.fastq.gz"), library.clone()] {
            fs::write(path, "").unwrap();
        }
        RunContext::create(RunOptions {
            read1: dir.join("S1_1.fastq.gz"),
            read2: dir.join("S1_2.fastq.gz"),
            library,
            out: dir.join("out"),
            log_name: "log.txt".to_string(),
            threads: 8,
            force: false,
            keep_tmp: false,
            dry_run: false,
        })
        .unwrap()
    }

    #[test]
    fn stages_chain_artifacts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let stages = sample_stages(&ctx);

        let kinds: Vec<StageKind> = stages.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StageKind::TrimDedup, StageKind::AdapterTrim, StageKind::Align, StageKind::Tally]);
        for pair in stages.windows(2) {
            assert!(pair[1].predecessors.contains(&pair[0].artifact));
        }
        assert_eq!(stages[0].artifact, ctx.tmp_dir.join("S1_1.r1.fastp.fq"));
        assert_eq!(stages[1].artifact, ctx.tmp_dir.join("S1.out.1.fastq"));
        assert_eq!(stages[2].artifact, ctx.out_dir.join("S1.sam"));
        assert_eq!(stages[3].artifact, ctx.out_dir.join("S1.counts.txt"));
        assert_eq!(stages[2].requires_index, Some(ctx.index.marker()));
    }

    #[test]
    fn tally_pipes_samtools_into_host_tools() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let tally = sample_stages(&ctx).pop().unwrap();

        let inv = tally.invocation(&NativeBackend, &ctx.out_dir);
        let programs: Vec<&str> = inv.commands.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["samtools", "cut", "sort", "uniq", "awk"]);
        assert_eq!(inv.stdout, Some(ctx.out_file(".counts.txt")));
        assert_eq!(inv.produces, vec![ctx.out_file(".counts.txt")]);
    }

    #[test]
    fn thread_count_reaches_multithreaded_tools_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let stages = sample_stages(&ctx);

        let fastp = stages[0].invocation(&NativeBackend, &ctx.out_dir).to_string();
        assert!(!fastp.contains("--thread"));
        let cutadapt = stages[1].invocation(&NativeBackend, &ctx.out_dir).to_string();
        assert!(cutadapt.contains("--cores=8"));
        let bowtie2 = stages[2].invocation(&NativeBackend, &ctx.out_dir).to_string();
        assert!(bowtie2.contains("-p 8"));
        assert!(bowtie2.ends_with(&format!("> {}", ctx.out_file(".sam").display())));
    }
}
