//! Runs a source unit under the trace recorder.
//!
//! [`Runner::run`] executes a unit with the recorder installed as its trace
//! hook and returns a [`codeflow_core::RunResult`] holding the event log, the
//! call tree and, for failed runs, a traceback-style description.

pub mod config;
pub mod error;
pub mod runner;
pub mod traceback;

pub use config::RunnerConfig;
pub use error::RunError;
pub use runner::Runner;
