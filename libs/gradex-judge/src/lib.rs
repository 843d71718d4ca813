//! Code assessment execution and scoring pipeline.
//!
//! Takes a student's submitted source for a coding question, runs it against
//! the question's hidden test cases on an external sandboxed execution
//! service, and produces per-case verdicts and an aggregate score. Also hosts
//! the cross-type (mcq/fill/code) reconciliation used at final submission.
//!
//! Architectural boundary, in layers:
//! - `client` talks to the execution service and knows nothing about scoring
//! - `inject` merges student code with the instructor harness, pure
//! - `runner` orchestrates dispatch/poll per test case and aggregates verdicts
//! - `scorer` reconciles question verdicts into submission grades

pub mod client;
pub mod config;
pub mod inject;
pub mod runner;
pub mod scorer;

pub use client::{ExecutionBackend, JudgeClient};
pub use config::{JudgeConfig, PollConfig, RunnerConfig};
pub use runner::Runner;
