//! Stable exit codes for cadfetch CLI commands.

/// The command finished. Unresolved identifiers, if any, are in the pending list.
pub const OK: i32 = 0;
/// Invalid configuration, missing input file, or another error before or after the passes.
pub const INVALID: i32 = 1;
/// `cadfetch run` stopped early on a signal or the stop flag; the report is partial.
pub const INTERRUPTED: i32 = 2;
