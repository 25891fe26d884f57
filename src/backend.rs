//! Execution backends turn a logical tool call into a concrete command line
//!
//! Stages describe *what* to run as a [`tool::ToolCall`]. The backend chosen for the run decides
//! *how*: straight from `PATH`, or inside a pinned container image. Tool flags are identical
//! under both so artifacts and resume checks do not depend on the backend.

use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

use crate::command::line::CommandLine;

/// Tools, arguments and container image pins
pub mod tool;

/// Tools installed on the host
pub mod native;

/// Tools run through a container runtime with bind-mounted directories
pub mod container;

pub trait ExecutionBackend {
    fn realize(&self, call: &tool::ToolCall) -> CommandLine;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Container,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Container => write!(f, "container"),
        }
    }
}
