//! Deterministic, pure logic shared by the fetch pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod naming;
pub mod partition;
pub mod types;
