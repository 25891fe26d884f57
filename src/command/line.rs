use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use shell_escape::escape;

/// A single program with its arguments, never passed through a shell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        CommandLine { program: program.into(), args: Vec::new(), env: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, escape(Cow::Borrowed(value.as_str())))?;
        }
        write!(f, "{}", escape(Cow::Borrowed(self.program.as_str())))?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            write!(f, " {}", escape(arg))?;
        }
        Ok(())
    }
}

/// Everything the executor needs to run one stage
///
/// Commands are connected stdout to stdin in order. The last command's stdout goes to
/// `stdout` when set, otherwise it is captured together with every command's stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub commands: Vec<CommandLine>,
    pub stdout: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    /// Host paths the invocation is expected to create
    pub produces: Vec<PathBuf>,
}

impl Invocation {
    pub fn new(command: CommandLine) -> Self {
        Invocation { commands: vec![command], stdout: None, dir: None, produces: Vec::new() }
    }

    pub fn pipe(mut self, command: CommandLine) -> Self {
        self.commands.push(command);
        self
    }

    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    pub fn produces(mut self, path: &Path) -> Self {
        self.produces.push(path.to_path_buf());
        self
    }

    /// Name of the first program, used in error messages
    pub fn program(&self) -> &str {
        self.commands.first().map(|c| c.program.as_str()).unwrap_or("")
    }
}

/// Rendered like a shell command so it can be pasted into a terminal to reproduce a stage
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", command)?;
        }
        if let Some(path) = &self.stdout {
            let path = path.to_string_lossy();
            write!(f, " > {}", escape(path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pipeline_with_quoting() {
        let inv = Invocation::new(CommandLine::new("samtools").args(["view", "-F", "0x80", "a b.sam"]))
            .pipe(CommandLine::new("sort").env("LC_ALL", "C"))
            .pipe(CommandLine::new("awk").arg("{printf(\"%s\\t%s\\n\", $2, $1)}"))
            .stdout_to(Path::new("/out/s.counts.txt"));

        let rendered = inv.to_string();
        assert!(rendered.starts_with("samtools view -F 0x80 'a b.sam' | LC_ALL=C sort | awk '"));
        assert!(rendered.ends_with(" > /out/s.counts.txt"));
        assert_eq!(inv.program(), "samtools");
    }
}
