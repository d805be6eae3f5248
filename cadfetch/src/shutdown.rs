//! End-of-run handling shared by normal completion and interruption.
//!
//! Whichever way a run ends, the same sequence runs: drop the temp directory,
//! dump telemetry, recompute the partition from that telemetry, rewrite the
//! pending file, and build the report. Only the report header and the exit
//! status differ.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tracing::{info, instrument, warn};

use crate::cancel::{CancelReason, InterruptFlag};
use crate::exit_codes;
use crate::io::layout::RunPaths;
use crate::io::pending::resume_from_events;
use crate::io::telemetry::TelemetryLog;

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every identifier resolved before the pass budget ran out.
    Completed,
    /// The pass budget ran out with identifiers still pending.
    PassesExhausted,
    /// Stopped early by a signal or the stop flag.
    Interrupted(CancelReason),
}

/// Final counts presented to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub stop: StopReason,
    pub passes_run: u32,
    pub max_passes: u32,
    pub success: usize,
    pub not_found: usize,
    /// Pending lines written, including repeated input lines.
    pub pending: usize,
    pub pending_path: PathBuf,
    pub telemetry_path: PathBuf,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        matches!(self.stop, StopReason::Interrupted(_))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.interrupted() {
            "PARTIAL REPORT (interrupted)"
        } else {
            "REPORT"
        };
        let rule = "=".repeat(44);
        writeln!(f, "{rule}")?;
        writeln!(f, "{title}")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "fetched:    {}", self.success)?;
        writeln!(f, "not found:  {}", self.not_found)?;
        if self.interrupted() {
            writeln!(f, "pending:    {}", self.pending)?;
        } else {
            writeln!(
                f,
                "pending:    {} (after {} of {} passes)",
                self.pending, self.passes_run, self.max_passes
            )?;
        }
        writeln!(f, "pending list: {}", self.pending_path.display())?;
        writeln!(f, "telemetry:    {}", self.telemetry_path.display())?;
        write!(f, "{rule}")
    }
}

/// Inputs to [`finalize_run`].
pub struct FinalizeRequest<'a> {
    pub paths: &'a RunPaths,
    pub identifiers: &'a [String],
    pub telemetry: &'a TelemetryLog,
    pub stop: StopReason,
    pub passes_run: u32,
    pub max_passes: u32,
}

/// Flush everything a run leaves behind and build its report.
///
/// Safe to call with an empty telemetry log (interrupted before the first item).
#[instrument(skip_all, fields(stop = ?request.stop, events = request.telemetry.len()))]
pub fn finalize_run(request: &FinalizeRequest<'_>) -> Result<RunReport> {
    remove_temp_dir(request.paths);

    request
        .telemetry
        .dump(&request.paths.telemetry_path)
        .context("dump telemetry")?;

    let partition = resume_from_events(
        request.identifiers,
        request.telemetry.events(),
        &request.paths.pending_path,
    )
    .context("write pending list")?;

    info!(
        success = partition.success.len(),
        not_found = partition.not_found.len(),
        pending = partition.pending.len(),
        "run finalized"
    );

    Ok(RunReport {
        stop: request.stop.clone(),
        passes_run: request.passes_run,
        max_passes: request.max_passes,
        success: partition.success.len(),
        not_found: partition.not_found.len(),
        pending: partition.pending.len(),
        pending_path: request.paths.pending_path.clone(),
        telemetry_path: request.paths.telemetry_path.clone(),
    })
}

/// Best effort: a leftover temp dir must not cost the telemetry dump or the pending list.
fn remove_temp_dir(paths: &RunPaths) {
    match fs::remove_dir_all(&paths.temp_dir) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            warn!(err = %err, path = %paths.temp_dir.display(), "failed to remove temp dir");
        }
    }
}

/// Route SIGINT and SIGTERM into `flag` instead of terminating the process.
///
/// The run then stops at the next item boundary and goes through
/// [`finalize_run`]. A child fetch in flight still receives the terminal's
/// SIGINT itself and usually exits early, which only costs a retry.
///
/// A second signal while `flag` is already raised exits at once with
/// [`exit_codes::INTERRUPTED`], skipping the flush; the previous run's pending
/// list stays on disk untouched.
pub fn register_interrupt_flag(flag: &InterruptFlag) -> Result<()> {
    for signal in [SIGINT, SIGTERM] {
        // Registered first so it sees the flag before this delivery raises it.
        signal_hook::flag::register_conditional_shutdown(
            signal,
            exit_codes::INTERRUPTED,
            flag.handle(),
        )
        .with_context(|| format!("register forced exit for signal {signal}"))?;
        signal_hook::flag::register(signal, flag.handle())
            .with_context(|| format!("register handler for signal {signal}"))?;
    }
    Ok(())
}
