//! Cooperative cancellation, polled between items.
//!
//! A pass asks its [`CancelSignal`] once before each item. Nothing interrupts
//! an invocation already in flight, so the worst-case latency is one fetch
//! plus one delay.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

/// Why a run stopped before finishing its passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The process received an interrupt or termination signal.
    Interrupt,
    /// The stop sentinel file appeared.
    StopFlag(PathBuf),
    /// Cancelled programmatically (tests, embedding callers).
    Requested,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("interrupt signal"),
            Self::StopFlag(path) => write!(f, "stop flag {}", path.display()),
            Self::Requested => f.write_str("cancellation requested"),
        }
    }
}

/// Source of cancellation requests.
pub trait CancelSignal {
    /// Return a reason if the run should stop before the next item.
    fn poll(&self) -> Option<CancelReason>;
}

/// Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn poll(&self) -> Option<CancelReason> {
        None
    }
}

/// Shared flag, raised by a signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying atomic, for registration with `signal_hook::flag`.
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.raised)
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}

impl CancelSignal for InterruptFlag {
    fn poll(&self) -> Option<CancelReason> {
        self.raised
            .load(Ordering::SeqCst)
            .then_some(CancelReason::Interrupt)
    }
}

/// Stop sentinel on disk. Its presence requests a stop; it is deleted when seen.
#[derive(Debug, Clone)]
pub struct StopFlagFile {
    path: PathBuf,
}

impl StopFlagFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CancelSignal for StopFlagFile {
    fn poll(&self) -> Option<CancelReason> {
        if !self.path.exists() {
            return None;
        }
        info!(path = %self.path.display(), "stop flag detected");
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(err = %err, path = %self.path.display(), "failed to remove stop flag");
        }
        Some(CancelReason::StopFlag(self.path.clone()))
    }
}

impl<A: CancelSignal, B: CancelSignal> CancelSignal for (A, B) {
    fn poll(&self) -> Option<CancelReason> {
        self.0.poll().or_else(|| self.1.poll())
    }
}

impl<C: CancelSignal + ?Sized> CancelSignal for &C {
    fn poll(&self) -> Option<CancelReason> {
        (**self).poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_flag_reports_once_raised() {
        let flag = InterruptFlag::new();
        assert_eq!(flag.poll(), None);
        flag.handle().store(true, Ordering::SeqCst);
        assert_eq!(flag.poll(), Some(CancelReason::Interrupt));
    }

    #[test]
    fn stop_flag_is_consumed_on_detection() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("stop.flag");
        let signal = StopFlagFile::new(&path);
        assert_eq!(signal.poll(), None);

        fs::write(&path, "").expect("flag");
        assert_eq!(signal.poll(), Some(CancelReason::StopFlag(path.clone())));
        assert!(!path.exists());
        assert_eq!(signal.poll(), None);
    }

    #[test]
    fn pair_checks_first_then_second() {
        let flag = InterruptFlag::new();
        let pair = (NeverCancel, flag.clone());
        assert_eq!(pair.poll(), None);
        flag.raise();
        assert_eq!(pair.poll(), Some(CancelReason::Interrupt));
    }
}
