//! Console logging and the per-run log file
//!
//! The console goes through `env_logger`. Each run additionally owns a [`RunLog`], which mirrors
//! every message into its own log file so a sample's history survives next to its artifacts.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use env_logger::Env;
use log::{error, info, warn};

use crate::error::ConfigError;

/// Timestamp layout shared by the console and the log files, e.g. `13-Sep-24 10:02:11`
static TIMESTAMP: &str = "%d-%b-%y %H:%M:%S";

/// Console logger, `info` unless RUST_LOG says otherwise
pub fn init_console() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "{} - {}", Local::now().format(TIMESTAMP), record.args())
        })
        .init();
}

/// Handle on the log file of one run
///
/// Lines are flushed as they are written and the file is closed when the handle is dropped, so
/// a failing stage still leaves its captured output on disk.
pub struct RunLog {
    path: PathBuf,
    file: Mutex<LineWriter<File>>,
}

impl RunLog {
    /// Open (append) the log file at `path`
    pub fn open(path: &Path) -> Result<RunLog, ConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogFile { path: path.to_path_buf(), source })?;
        Ok(RunLog { path: path.to_path_buf(), file: Mutex::new(LineWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: &str) {
        info!("{}", message);
        self.write(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
        self.write(message);
    }

    pub fn error(&self, message: &str) {
        error!("{}", message);
        self.write(message);
    }

    /// Append raw tool output, one log record per line
    pub fn info_lines(&self, output: &[u8]) {
        for line in String::from_utf8_lossy(output).lines() {
            self.info(line.trim_end());
        }
    }

    pub fn error_lines(&self, output: &[u8]) {
        for line in String::from_utf8_lossy(output).lines() {
            self.error(line.trim_end());
        }
    }

    fn write(&self, message: &str) {
        let stamp = Local::now().format(TIMESTAMP);
        // a poisoned lock still holds a usable writer
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(file, "{} - {}", stamp, message) {
            warn!("Can't write to log file {}: {}", self.path.display(), err);
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Ok(file) = self.file.get_mut() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn run_log_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1_log.txt");
        {
            let log = RunLog::open(&path).unwrap();
            log.info("****** Fastp ******");
            log.error_lines(b"first line\r\nsecond line\n");
        }
        {
            let log = RunLog::open(&path).unwrap();
            log.warn("resumed");
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" - ****** Fastp ******"));
        assert!(lines[1].ends_with(" - first line"));
        assert!(lines[2].ends_with(" - second line"));
        assert!(lines[3].ends_with(" - resumed"));
    }

    #[test]
    fn missing_directory_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunLog::open(&dir.path().join("nope").join("log.txt"));
        assert!(matches!(result, Err(ConfigError::LogFile { .. })));
    }
}
