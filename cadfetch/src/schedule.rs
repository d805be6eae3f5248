//! Bounded multi-pass retry scheduling.

use tracing::{info, instrument};

use crate::cancel::{CancelReason, CancelSignal};
use crate::io::fetch::Fetcher;
use crate::io::telemetry::TelemetryLog;
use crate::pass::{ItemProgress, PassRunner};

/// Reason why `run_schedule` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleStop {
    /// A pass ended with an empty retry bucket.
    Drained,
    /// `max_passes` passes ran and some identifiers are still unresolved.
    PassesExhausted,
    /// Cancellation was observed between items.
    Cancelled(CancelReason),
}

/// Counts for one completed (or cut short) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub pass: u32,
    pub input: usize,
    pub success: usize,
    pub not_found: usize,
    pub retry: usize,
}

/// Accumulated result of all passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub passes: Vec<PassSummary>,
    /// Resolved identifiers in resolution order.
    pub success: Vec<String>,
    pub not_found: Vec<String>,
    /// Retry bucket of the last pass that ran. After a cancelled pass it holds
    /// only the items that pass attempted and left retryable; unreached items
    /// are in no bucket.
    pub retry: Vec<String>,
    pub stop: ScheduleStop,
}

impl ScheduleOutcome {
    pub fn passes_run(&self) -> u32 {
        self.passes.len() as u32
    }
}

/// Run up to `max_passes` passes.
///
/// Pass 1 covers `identifiers`; each later pass covers only the previous
/// pass's retry bucket, in the same order. Resolved identifiers are never
/// attempted again.
#[instrument(skip_all, fields(max_passes = max_passes, items = identifiers.len()))]
pub fn run_schedule<F: Fetcher, C: CancelSignal, P: FnMut(&ItemProgress<'_>)>(
    runner: &PassRunner<'_, F, C>,
    identifiers: &[String],
    max_passes: u32,
    telemetry: &mut TelemetryLog,
    mut on_item: P,
) -> ScheduleOutcome {
    let mut outcome = ScheduleOutcome {
        passes: Vec::new(),
        success: Vec::new(),
        not_found: Vec::new(),
        retry: identifiers.to_vec(),
        stop: ScheduleStop::Drained,
    };

    for pass in 1..=max_passes {
        if outcome.retry.is_empty() {
            break;
        }
        let input = std::mem::take(&mut outcome.retry);
        let result = runner.run(pass, &input, telemetry, &mut on_item);

        let summary = PassSummary {
            pass,
            input: input.len(),
            success: result.success.len(),
            not_found: result.not_found.len(),
            retry: result.retry.len(),
        };
        info!(
            pass,
            input = summary.input,
            success = summary.success,
            not_found = summary.not_found,
            retry = summary.retry,
            "pass finished"
        );
        outcome.passes.push(summary);
        outcome.success.extend(result.success);
        outcome.not_found.extend(result.not_found);
        outcome.retry = result.retry;

        if let Some(reason) = result.cancelled {
            outcome.stop = ScheduleStop::Cancelled(reason);
            return outcome;
        }
    }

    if !outcome.retry.is_empty() {
        outcome.stop = ScheduleStop::PassesExhausted;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::test_support::{CancelAfter, ScriptedAttempt, ScriptedFetcher, TestWorkspace, ids};
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn later_passes_only_see_previous_retry_bucket() {
        let ws = TestWorkspace::new().expect("workspace");
        let fetcher = ScriptedFetcher::new()
            .script("A", [ScriptedAttempt::file("a")])
            .script("B", [ScriptedAttempt::stderr("no object")])
            .script(
                "C",
                [ScriptedAttempt::stderr("timeout"), ScriptedAttempt::file("c")],
            )
            .script(
                "D",
                [
                    ScriptedAttempt::stderr("HTTP 503"),
                    ScriptedAttempt::stderr("HTTP 503"),
                    ScriptedAttempt::file("d"),
                ],
            );
        let executor = ws.executor(fetcher);
        let activity = ws.activity_log();
        let runner = PassRunner::new(&executor, &NeverCancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();

        let outcome = run_schedule(
            &runner,
            &ids(&["A", "B", "C", "D"]),
            5,
            &mut telemetry,
            |_| {},
        );

        assert_eq!(outcome.stop, ScheduleStop::Drained);
        assert_eq!(outcome.passes_run(), 3);
        assert_eq!(outcome.success, ids(&["A", "C", "D"]));
        assert_eq!(outcome.not_found, ids(&["B"]));
        assert!(outcome.retry.is_empty());
        assert_eq!(
            executor.fetcher().calls(),
            ids(&["A", "B", "C", "D", "C", "D", "D"])
        );
        assert_eq!(
            outcome.passes.iter().map(|p| p.input).collect::<Vec<_>>(),
            vec![4, 2, 1]
        );
    }

    #[test]
    fn stops_when_passes_exhausted() {
        let ws = TestWorkspace::new().expect("workspace");
        let fetcher = ScriptedFetcher::new().repeat("D", ScriptedAttempt::stderr("timeout"));
        let executor = ws.executor(fetcher);
        let activity = ws.activity_log();
        let runner = PassRunner::new(&executor, &NeverCancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();

        let outcome = run_schedule(&runner, &ids(&["D"]), 3, &mut telemetry, |_| {});

        assert_eq!(outcome.stop, ScheduleStop::PassesExhausted);
        assert_eq!(outcome.passes_run(), 3);
        assert_eq!(outcome.retry, ids(&["D"]));
        assert_eq!(executor.fetcher().calls().len(), 3);
    }

    #[test]
    fn resolved_identifiers_never_reenter_retry() {
        let ws = TestWorkspace::new().expect("workspace");
        let fetcher = ScriptedFetcher::new()
            .script("A", [ScriptedAttempt::file("a")])
            .script("B", [ScriptedAttempt::stderr("not found")])
            .repeat("C", ScriptedAttempt::stderr("timeout"));
        let executor = ws.executor(fetcher);
        let activity = ws.activity_log();
        let runner = PassRunner::new(&executor, &NeverCancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();
        let mut resolved: HashSet<String> = HashSet::new();
        let mut violations = Vec::new();

        run_schedule(
            &runner,
            &ids(&["A", "B", "C"]),
            4,
            &mut telemetry,
            |progress| {
                if resolved.contains(progress.identifier) {
                    violations.push(progress.identifier.to_string());
                }
                if !matches!(
                    progress.outcome,
                    crate::core::types::AttemptOutcome::Retryable { .. }
                ) {
                    resolved.insert(progress.identifier.to_string());
                }
            },
        );

        assert!(violations.is_empty(), "re-attempted: {violations:?}");
    }

    #[test]
    fn cancellation_stops_all_future_passes() {
        let ws = TestWorkspace::new().expect("workspace");
        let fetcher = ScriptedFetcher::new().repeat("A", ScriptedAttempt::stderr("timeout"));
        let executor = ws.executor(fetcher);
        let activity = ws.activity_log();
        let cancel = CancelAfter::new(2);
        let runner = PassRunner::new(&executor, &cancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();

        let outcome = run_schedule(&runner, &ids(&["A"]), 10, &mut telemetry, |_| {});

        assert!(matches!(outcome.stop, ScheduleStop::Cancelled(_)));
        assert_eq!(outcome.passes_run(), 3);
        assert!(outcome.retry.is_empty());
        assert_eq!(executor.fetcher().calls(), ids(&["A", "A"]));
    }

    #[test]
    fn cancelled_pass_keeps_its_partial_retry_bucket() {
        let ws = TestWorkspace::new().expect("workspace");
        let fetcher = ScriptedFetcher::new().repeat("A", ScriptedAttempt::stderr("timeout"));
        let executor = ws.executor(fetcher);
        let activity = ws.activity_log();
        let cancel = CancelAfter::new(1);
        let runner = PassRunner::new(&executor, &cancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();

        let outcome = run_schedule(&runner, &ids(&["A", "B"]), 10, &mut telemetry, |_| {});

        assert!(matches!(outcome.stop, ScheduleStop::Cancelled(_)));
        assert_eq!(outcome.retry, ids(&["A"]));
    }

    #[test]
    fn empty_input_runs_no_pass() {
        let ws = TestWorkspace::new().expect("workspace");
        let executor = ws.executor(ScriptedFetcher::new());
        let activity = ws.activity_log();
        let runner = PassRunner::new(&executor, &NeverCancel, &activity, Duration::ZERO);
        let mut telemetry = TelemetryLog::new();

        let outcome = run_schedule(&runner, &[], 3, &mut telemetry, |_| {});

        assert_eq!(outcome.stop, ScheduleStop::Drained);
        assert_eq!(outcome.passes_run(), 0);
    }
}
