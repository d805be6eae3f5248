//! Success / not-found / pending partition derived from telemetry.
//!
//! The partition is recomputed from the event log every time it is needed and
//! is never read from in-memory retry buckets. An interrupted run, which may
//! stop in the middle of a pass, still yields a correct partition.

use std::collections::HashSet;

use crate::core::types::TelemetryEvent;

/// Disjoint split of the original input.
///
/// `success` and `not_found` hold each identifier once, in first-seen input
/// order. `pending` keeps every input line that is not resolved, in input
/// order, so duplicate input lines stay duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkPartition {
    pub success: Vec<String>,
    pub not_found: Vec<String>,
    pub pending: Vec<String>,
}

impl WorkPartition {
    /// Number of distinct pending identifiers.
    pub fn pending_distinct(&self) -> usize {
        self.pending.iter().collect::<HashSet<_>>().len()
    }
}

/// Compute the partition for `original` from an event snapshot.
///
/// - `success`: at least one `success` event.
/// - `not_found`: at least one `error` event with `error = "not_found"`, and no success.
/// - `pending`: everything else.
///
/// Events for identifiers outside `original` are ignored.
pub fn compute_partition(original: &[String], events: &[TelemetryEvent]) -> WorkPartition {
    let mut succeeded: HashSet<&str> = HashSet::new();
    let mut missing: HashSet<&str> = HashSet::new();
    for event in events {
        if event.is_success() {
            succeeded.insert(event.cad.as_str());
        } else if event.is_not_found() {
            missing.insert(event.cad.as_str());
        }
    }

    let mut partition = WorkPartition::default();
    let mut seen: HashSet<&str> = HashSet::new();
    for identifier in original {
        let id = identifier.as_str();
        if succeeded.contains(id) {
            if seen.insert(id) {
                partition.success.push(identifier.clone());
            }
        } else if missing.contains(id) {
            if seen.insert(id) {
                partition.not_found.push(identifier.clone());
            }
        } else {
            partition.pending.push(identifier.clone());
        }
    }
    partition
}
