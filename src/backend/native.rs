use std::ffi::OsString;

use crate::backend::tool::{Arg, ToolCall};
use crate::backend::ExecutionBackend;
use crate::command::line::CommandLine;

/// Tools are expected on the host `PATH`, paths are passed unchanged
#[derive(Debug, Default, Clone)]
pub struct NativeBackend;

impl ExecutionBackend for NativeBackend {
    fn realize(&self, call: &ToolCall) -> CommandLine {
        let args = call.args.iter().map(|arg| match arg {
            Arg::Flag(flag) => OsString::from(flag),
            Arg::Path(path) => path.as_os_str().to_os_string(),
        });
        CommandLine::new(call.tool.program()).args(args)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::backend::tool::Tool;

    #[test]
    fn passes_paths_through() {
        let call = ToolCall::new(Tool::Bowtie2Build)
            .path(Path::new("/lib/ags.fasta"))
            .path(Path::new("/lib/bowtie2_indices/aglib"));
        let line = NativeBackend.realize(&call);
        assert_eq!(line.program, "bowtie2-build");
        assert_eq!(
            line.args,
            vec![OsString::from("/lib/ags.fasta"), OsString::from("/lib/bowtie2_indices/aglib")]
        );
    }
}
