use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::backend::tool::{Arg, ImageSet, ToolCall};
use crate::backend::ExecutionBackend;
use crate::command::line::CommandLine;

/// Root of the in-container mount points
static MOUNT_ROOT: &str = "/mnt";

/// Tools run from pinned images through a container runtime (docker, podman)
///
/// Every directory holding a path argument is bind-mounted at `/mnt/dN` and the argument is
/// rewritten to point there. Outputs land in a mounted host directory, so the next stage sees
/// them at their host path.
#[derive(Debug, Clone)]
pub struct ContainerBackend {
    runtime: String,
    images: ImageSet,
}

impl ContainerBackend {
    pub fn new(runtime: &str, images: ImageSet) -> Self {
        ContainerBackend { runtime: runtime.to_string(), images }
    }
}

/// Host directories and their mount points, in order of first use
#[derive(Debug, Default)]
struct Mounts {
    dirs: Vec<PathBuf>,
}

impl Mounts {
    fn translate(&mut self, path: &Path) -> PathBuf {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        let index = match self.dirs.iter().position(|d| d == &dir) {
            Some(index) => index,
            None => {
                self.dirs.push(dir);
                self.dirs.len() - 1
            }
        };
        let mount = mount_point(index);
        match path.file_name() {
            Some(name) => mount.join(name),
            None => mount,
        }
    }

    fn volume_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.dirs.len() * 2);
        for (index, dir) in self.dirs.iter().enumerate() {
            let mut volume = dir.as_os_str().to_os_string();
            volume.push(":");
            volume.push(mount_point(index).as_os_str());
            args.push(OsString::from("-v"));
            args.push(volume);
        }
        args
    }
}

fn mount_point(index: usize) -> PathBuf {
    Path::new(MOUNT_ROOT).join(format!("d{index}"))
}

impl ExecutionBackend for ContainerBackend {
    fn realize(&self, call: &ToolCall) -> CommandLine {
        let mut mounts = Mounts::default();
        let tool_args: Vec<OsString> = call
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Flag(flag) => OsString::from(flag),
                Arg::Path(path) => mounts.translate(path).into_os_string(),
            })
            .collect();

        let image = self.images.image(call.tool).unwrap_or(call.tool.program());
        CommandLine::new(self.runtime.as_str())
            .args(["run", "--rm"])
            .args(mounts.volume_args())
            .arg(image)
            .arg(call.tool.program())
            .args(tool_args)
    }
}
