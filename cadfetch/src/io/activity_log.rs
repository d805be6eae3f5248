//! Human-readable activity log, appended across runs.
//!
//! One line per lifecycle event: `2024-05-01 12:00:00 | OK      | message`.
//! Write failures are reported through tracing and never abort a fetch.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

use crate::core::types::AttemptOutcome;

#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&self, identifier: &str) {
        self.write("START", identifier);
    }

    pub fn outcome(&self, identifier: &str, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Success {
                artifact_path,
                size_bytes,
            } => self.write(
                "OK",
                &format!("{} | {size_bytes} bytes", artifact_path.display()),
            ),
            AttemptOutcome::NotFound => self.write("ERROR", &format!("{identifier} | not found")),
            AttemptOutcome::Retryable { error_text } => {
                self.write("RETRY", &format!("{identifier} | {error_text}"));
            }
        }
    }

    /// Append one line; failures are logged and swallowed.
    pub fn write(&self, event: &str, message: &str) {
        if let Err(err) = self.try_write(event, message) {
            warn!(err = %format!("{err:#}"), path = %self.path.display(), "activity log write failed");
        }
    }

    fn try_write(&self, event: &str, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(file, "{}", format_line(&timestamp(), event, message))
            .with_context(|| format!("append {}", self.path.display()))
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_line(ts: &str, event: &str, message: &str) -> String {
    // Multi-line stderr would break the one-line-per-event format.
    let message = message.replace(['\r', '\n'], " ");
    format!("{ts} | {event:<7} | {message}")
}
