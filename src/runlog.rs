//! Append-only run log.
//!
//! Timestamped text lines for exhaustion and abandonment events — the
//! durable record of which securities yielded nothing, independent of the
//! tracing output.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Append-only timestamped text sink.
pub struct RunLog {
    file: File,
}

impl RunLog {
    /// Open or create the log file, appending to existing content.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open run log: {}", path.display()))?;

        Ok(Self { file })
    }

    /// Append one timestamped line.
    pub fn log(&mut self, message: &str) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        writeln!(self.file, "{timestamp} - {message}")?;
        Ok(())
    }
}

/// Sink the orchestrator reports exhaustion/abandonment through, so tests
/// can count events without touching the filesystem.
pub trait EventLog: Send {
    fn log(&mut self, message: &str);
}

impl EventLog for RunLog {
    fn log(&mut self, message: &str) {
        if let Err(e) = RunLog::log(self, message) {
            tracing::warn!("run log write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        {
            let mut log = RunLog::open(&path).unwrap();
            log.log("first").unwrap();
        }
        {
            let mut log = RunLog::open(&path).unwrap();
            log.log("second").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));
        // rfc3339 timestamps start each line
        assert!(lines[0].starts_with("20"));
    }
}
