use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// External programs wrapped by the pipeline
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    Fastp,
    Cutadapt,
    Bowtie2,
    Bowtie2Build,
    Samtools,
}

impl Tool {
    /// Executable name, on the host and inside the image
    pub fn program(&self) -> &'static str {
        match self {
            Tool::Fastp => "fastp",
            Tool::Cutadapt => "cutadapt",
            Tool::Bowtie2 => "bowtie2",
            Tool::Bowtie2Build => "bowtie2-build",
            Tool::Samtools => "samtools",
        }
    }

    /// Key in the image table; bowtie2-build ships in the bowtie2 image
    pub fn image_key(&self) -> &'static str {
        match self {
            Tool::Bowtie2 | Tool::Bowtie2Build => "bowtie2",
            other => other.program(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// One argument of a tool call, paths are kept apart so a backend can relocate them
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Flag(String),
    Path(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub tool: Tool,
    pub args: Vec<Arg>,
}

impl ToolCall {
    pub fn new(tool: Tool) -> Self {
        ToolCall { tool, args: Vec::new() }
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.args.push(Arg::Flag(flag.into()));
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(flags.into_iter().map(|f| Arg::Flag(f.into())));
        self
    }

    pub fn path(mut self, path: &Path) -> Self {
        self.args.push(Arg::Path(path.to_path_buf()));
        self
    }

    /// Flag followed by a path argument
    pub fn opt_path(self, flag: &str, path: &Path) -> Self {
        self.flag(flag).path(path)
    }
}

/// Container images by tool key, built-in pins overridden by the config file
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ImageSet {
    images: BTreeMap<String, String>,
}

impl ImageSet {
    /// Pins embedded at build time
    pub fn pinned() -> ImageSet {
        /// included image table
        static IMAGES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/images.json"));
        serde_json::from_str(IMAGES).expect("Valid built-in image table")
    }

    pub fn image(&self, tool: Tool) -> Option<&str> {
        self.images.get(tool.image_key()).map(String::as_str)
    }

    /// Replace pins with the entries of `other`
    pub fn merge(&mut self, other: ImageSet) {
        self.images.extend(other.images);
    }
}

impl Default for ImageSet {
    fn default() -> Self {
        ImageSet::pinned()
    }
}
