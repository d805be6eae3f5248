//! Retry-and-resume batch fetcher for cadastral geometry.
//!
//! Reads identifiers from a text file, runs an external download tool once per
//! identifier, and retries transient failures in bounded passes. Every run
//! leaves a telemetry dump and a pending list, so the next run can resume from
//! whatever is still unresolved. The layout keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, naming, partition).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, process execution, logs).
//!   Isolated behind traits where tests need fakes.
//!
//! Orchestration modules ([`pass`], [`schedule`], [`shutdown`], [`run`]) tie the
//! two together for the CLI commands.

pub mod cancel;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pass;
pub mod run;
pub mod schedule;
pub mod shutdown;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
