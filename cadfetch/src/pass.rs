//! One sequential sweep over a list of identifiers.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::cancel::{CancelReason, CancelSignal};
use crate::core::types::AttemptOutcome;
use crate::io::activity_log::ActivityLog;
use crate::io::fetch::{FetchExecutor, Fetcher};
use crate::io::telemetry::TelemetryLog;

/// Progress notification for one finished item.
#[derive(Debug, Clone, Copy)]
pub struct ItemProgress<'a> {
    /// 1-indexed pass number.
    pub pass: u32,
    /// 1-indexed position within the pass.
    pub index: usize,
    pub total: usize,
    pub identifier: &'a str,
    pub outcome: &'a AttemptOutcome,
}

/// Buckets produced by one pass. Every attempted identifier lands in exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub success: Vec<String>,
    pub not_found: Vec<String>,
    pub retry: Vec<String>,
    /// Set when the pass stopped early; unreached items are in no bucket.
    pub cancelled: Option<CancelReason>,
}

impl PassOutcome {
    pub fn attempted(&self) -> usize {
        self.success.len() + self.not_found.len() + self.retry.len()
    }
}

/// Drives [`FetchExecutor`] over a list, one item at a time.
pub struct PassRunner<'a, F, C> {
    executor: &'a FetchExecutor<F>,
    cancel: &'a C,
    activity: &'a ActivityLog,
    delay: Duration,
}

impl<'a, F: Fetcher, C: CancelSignal> PassRunner<'a, F, C> {
    pub fn new(
        executor: &'a FetchExecutor<F>,
        cancel: &'a C,
        activity: &'a ActivityLog,
        delay: Duration,
    ) -> Self {
        Self {
            executor,
            cancel,
            activity,
            delay,
        }
    }

    /// Process `identifiers` in order.
    ///
    /// Cancellation is polled before each item; when raised the pass returns
    /// at once with the buckets filled so far. The configured delay follows
    /// every attempted item, whatever its outcome.
    #[instrument(skip_all, fields(pass = pass, items = identifiers.len()))]
    pub fn run<P: FnMut(&ItemProgress<'_>)>(
        &self,
        pass: u32,
        identifiers: &[String],
        telemetry: &mut TelemetryLog,
        mut on_item: P,
    ) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        let total = identifiers.len();

        for (offset, identifier) in identifiers.iter().enumerate() {
            if let Some(reason) = self.cancel.poll() {
                info!(?reason, attempted = offset, total, "pass cancelled");
                outcome.cancelled = Some(reason);
                return outcome;
            }

            telemetry.record_start(identifier);
            self.activity.start(identifier);

            let attempt = self.executor.fetch(identifier);

            telemetry.record_outcome(identifier, &attempt);
            self.activity.outcome(identifier, &attempt);
            debug!(identifier = %identifier, outcome = attempt.label(), "item finished");

            on_item(&ItemProgress {
                pass,
                index: offset + 1,
                total,
                identifier,
                outcome: &attempt,
            });

            let bucket = match attempt {
                AttemptOutcome::Success { .. } => &mut outcome.success,
                AttemptOutcome::NotFound => &mut outcome.not_found,
                AttemptOutcome::Retryable { .. } => &mut outcome.retry,
            };
            bucket.push(identifier.clone());

            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }

        outcome
    }
}
