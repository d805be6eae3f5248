//! Durable pending list: the identifiers a future run should resubmit.

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::core::partition::{WorkPartition, compute_partition};
use crate::core::types::TelemetryEvent;

/// Replace `path` with `pending`, one identifier per line.
pub fn write_pending(path: &Path, pending: &[String]) -> Result<()> {
    let mut buf = String::new();
    for identifier in pending {
        buf.push_str(identifier);
        buf.push('\n');
    }
    crate::io::write_atomic(path, &buf)?;
    debug!(path = %path.display(), count = pending.len(), "pending list written");
    Ok(())
}

/// Compute the partition from `events` and persist its pending part.
pub fn resume_from_events(
    original: &[String],
    events: &[TelemetryEvent],
    pending_path: &Path,
) -> Result<WorkPartition> {
    let partition = compute_partition(original, events);
    write_pending(pending_path, &partition.pending)?;
    Ok(partition)
}
