//! Run orchestration: input, schedule, finalization.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::cancel::CancelSignal;
use crate::core::classifier::ErrorClassifier;
use crate::core::partition::WorkPartition;
use crate::io::activity_log::ActivityLog;
use crate::io::config::FetchConfig;
use crate::io::fetch::{FetchExecutor, Fetcher};
use crate::io::identifiers::load_identifiers;
use crate::io::layout::RunPaths;
use crate::io::pending::resume_from_events;
use crate::io::telemetry::{TelemetryLog, load_telemetry};
use crate::pass::{ItemProgress, PassRunner};
use crate::schedule::{ScheduleStop, run_schedule};
use crate::shutdown::{FinalizeRequest, RunReport, StopReason, finalize_run};

/// Fetch every identifier in `paths.input_path` and leave the pending list behind.
///
/// A missing input file fails before any directory or artifact is touched.
/// Everything after that, per-item failures and interruption included, ends
/// in [`finalize_run`].
#[instrument(skip_all, fields(input = %paths.input_path.display()))]
pub fn execute_run<F, C, P>(
    paths: &RunPaths,
    config: &FetchConfig,
    fetcher: F,
    cancel: &C,
    on_item: P,
) -> Result<RunReport>
where
    F: Fetcher,
    C: CancelSignal,
    P: FnMut(&ItemProgress<'_>),
{
    config.validate()?;
    let identifiers = load_identifiers(&paths.input_path)?;
    paths.ensure_dirs()?;

    let max_passes = config.downloader.retry_cycles;
    if config.downloader.dynamic_backoff {
        info!("dynamic_backoff is set; passes still use the fixed delay");
    }

    let classifier =
        ErrorClassifier::with_extra_phrases(&config.classifier.extra_not_found_phrases);
    let executor = FetchExecutor::new(fetcher, &paths.temp_dir, &paths.output_dir, classifier);
    let activity = ActivityLog::new(&paths.activity_log_path);
    activity.write(
        "RUN",
        &format!(
            "{} identifiers from {}, up to {max_passes} passes",
            identifiers.len(),
            paths.input_path.display()
        ),
    );

    let runner = PassRunner::new(&executor, cancel, &activity, config.downloader.delay());
    let mut telemetry = TelemetryLog::new();
    let schedule = run_schedule(&runner, &identifiers, max_passes, &mut telemetry, on_item);
    let passes_run = schedule.passes_run();

    let stop = match schedule.stop {
        ScheduleStop::Drained => StopReason::Completed,
        ScheduleStop::PassesExhausted => StopReason::PassesExhausted,
        ScheduleStop::Cancelled(reason) => {
            activity.write("STOP", &reason.to_string());
            StopReason::Interrupted(reason)
        }
    };

    let report = finalize_run(&FinalizeRequest {
        paths,
        identifiers: &identifiers,
        telemetry: &telemetry,
        stop,
        passes_run,
        max_passes,
    })?;
    activity.write(
        "DONE",
        &format!(
            "success {} | not found {} | pending {}",
            report.success, report.not_found, report.pending
        ),
    );
    Ok(report)
}

/// Recompute the partition from the last telemetry dump and rewrite the pending list.
pub fn rebuild_pending(paths: &RunPaths) -> Result<WorkPartition> {
    let identifiers = load_identifiers(&paths.input_path)?;
    let events = load_telemetry(&paths.telemetry_path)?;
    resume_from_events(&identifiers, &events, &paths.pending_path)
        .with_context(|| format!("rewrite {}", paths.pending_path.display()))
}
