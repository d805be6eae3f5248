//! Run-scoped telemetry: an append-only event log dumped to JSON on exit.
//!
//! The log lives in memory for the whole run and is written out in one piece
//! at the end (normal or interrupted), replacing any previous dump. It is not
//! an incremental journal: a kill that bypasses shutdown loses the run's events.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::debug;

use crate::core::types::{AttemptOutcome, TelemetryEvent};

/// Ordered, append-only event log owned by one run.
#[derive(Debug, Clone, Default)]
pub struct TelemetryLog {
    events: Vec<TelemetryEvent>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: TelemetryEvent) {
        self.events.push(event);
    }

    pub fn record_start(&mut self, identifier: &str) {
        self.append(TelemetryEvent::start(timestamp(), identifier));
    }

    pub fn record_outcome(&mut self, identifier: &str, outcome: &AttemptOutcome) {
        self.append(TelemetryEvent::for_outcome(timestamp(), identifier, outcome));
    }

    /// Borrowed view of every event appended so far.
    pub fn events(&self) -> &[TelemetryEvent] {
        &self.events
    }

    /// Owned copy of the events appended so far.
    pub fn snapshot(&self) -> Vec<TelemetryEvent> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Write all events as a pretty JSON array, replacing `path`.
    pub fn dump(&self, path: &Path) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(&self.events).context("serialize telemetry")?;
        buf.push('\n');
        crate::io::write_atomic(path, &buf)?;
        debug!(path = %path.display(), events = self.events.len(), "telemetry dumped");
        Ok(())
    }
}

/// Read a telemetry dump written by [`TelemetryLog::dump`].
pub fn load_telemetry(path: &Path) -> Result<Vec<TelemetryEvent>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read telemetry {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse telemetry {}", path.display()))
}

/// Local time in ISO 8601 with microseconds.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
