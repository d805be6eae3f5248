//! Shared deterministic types for the fetch pipeline.
//!
//! These types define stable contracts between components. The serialized
//! shape of [`TelemetryEvent`] is the on-disk telemetry format and must stay
//! stable across releases.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Error value recorded on `error` events for identifiers the provider does not know.
pub const NOT_FOUND_ERROR: &str = "not_found";

/// Normalized result of one fetch attempt for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The artifact was produced and copied to the output directory.
    Success { artifact_path: PathBuf, size_bytes: u64 },
    /// The provider reported that the object does not exist. Terminal.
    NotFound,
    /// Anything else: spawn failures, timeouts, server errors, empty stderr.
    Retryable { error_text: String },
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::NotFound => "not_found",
            AttemptOutcome::Retryable { .. } => "retry",
        }
    }
}

/// Verdict of the error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Retryable,
}

/// Kind of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Success,
    Error,
    Retry,
}

/// One structured telemetry record.
///
/// Serialized as `{"ts", "cad", "event", ...}` with kind-specific fields
/// (`file` and `size` for success, `error` for error/retry) omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts: String,
    pub cad: String,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TelemetryEvent {
    pub fn start(ts: String, cad: &str) -> Self {
        Self {
            ts,
            cad: cad.to_string(),
            event: EventKind::Start,
            file: None,
            size: None,
            error: None,
        }
    }

    /// Build the closing event for an attempt outcome.
    pub fn for_outcome(ts: String, cad: &str, outcome: &AttemptOutcome) -> Self {
        let base = Self::start(ts, cad);
        match outcome {
            AttemptOutcome::Success {
                artifact_path,
                size_bytes,
            } => Self {
                event: EventKind::Success,
                file: artifact_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()),
                size: Some(*size_bytes),
                ..base
            },
            AttemptOutcome::NotFound => Self {
                event: EventKind::Error,
                error: Some(NOT_FOUND_ERROR.to_string()),
                ..base
            },
            AttemptOutcome::Retryable { error_text } => Self {
                event: EventKind::Retry,
                error: Some(error_text.clone()),
                ..base
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.event == EventKind::Success
    }

    pub fn is_not_found(&self) -> bool {
        self.event == EventKind::Error && self.error.as_deref() == Some(NOT_FOUND_ERROR)
    }
}
