//! Optional JSON configuration file
//!
//! ```json
//! { "backend": "container", "runtime": "podman", "images": { "samtools": "local/samtools:1.20" } }
//! ```
//!
//! Every key is optional. Command line flags win over the file, the file wins over built-ins.

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::backend::container::ContainerBackend;
use crate::backend::native::NativeBackend;
use crate::backend::tool::ImageSet;
use crate::backend::{BackendKind, ExecutionBackend};
use crate::error::ConfigError;

static DEFAULT_RUNTIME: &str = "docker";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub backend: Option<BackendKind>,
    pub runtime: Option<String>,
    pub images: Option<ImageSet>,
}

impl Config {
    /// Read the file at `path`, or the empty configuration when there is none
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Config::default()),
        };
        info!("Reading configuration at {}", path.display());
        let json = fs::read_to_string(path)
            .map_err(|source| ConfigError::ConfigRead { path: path.to_path_buf(), source })?;
        serde_json::from_str(&json)
            .map_err(|source| ConfigError::ConfigParse { path: path.to_path_buf(), source })
    }

    /// Backend for the whole run, chosen once
    pub fn backend(&self, flag: Option<BackendKind>) -> (BackendKind, Box<dyn ExecutionBackend>) {
        let kind = flag.or(self.backend).unwrap_or(BackendKind::Native);
        let backend: Box<dyn ExecutionBackend> = match kind {
            BackendKind::Native => Box::new(NativeBackend),
            BackendKind::Container => {
                let mut images = ImageSet::pinned();
                if let Some(custom) = &self.images {
                    images.merge(custom.clone());
                }
                let runtime = self.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME);
                Box::new(ContainerBackend::new(runtime, images))
            }
        };
        (kind, backend)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::backend::tool::{Tool, ToolCall};

    #[test]
    fn no_file_means_native() {
        let config = Config::load(None).unwrap();
        let (kind, backend) = config.backend(None);
        assert_eq!(kind, BackendKind::Native);
        assert_eq!(backend.realize(&ToolCall::new(Tool::Samtools)).program, "samtools");
    }

    #[test]
    fn flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agscreen.json");
        fs::write(&path, r#"{"backend": "container", "runtime": "podman"}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let (kind, backend) = config.backend(None);
        assert_eq!(kind, BackendKind::Container);
        assert_eq!(backend.realize(&ToolCall::new(Tool::Fastp)).program, "podman");

        let (kind, _) = config.backend(Some(BackendKind::Native));
        assert_eq!(kind, BackendKind::Native);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agscreen.json");
        fs::write(&path, r#"{"backnd": "container"}"#).unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::ConfigParse { .. })));
    }

    #[test]
    fn missing_file_is_reported() {
        let path = PathBuf::from("/nonexistent/agscreen.json");
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::ConfigRead { .. })));
    }
}
