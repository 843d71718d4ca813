use thiserror::Error;

/// Failure taxonomy for the assessment pipeline.
///
/// Only `Configuration`, `UnsupportedLanguage` and `NotFound` propagate out of
/// a request as a whole. `Dispatch`, `ExecutionTimeout` and `Decode` are
/// scoped to a single test case: the runner captures them and turns them into
/// a failed `TestCaseResult` so one bad case never aborts the batch.
#[derive(Debug, Error)]
pub enum Error {
    /// The question or harness is misconfigured (missing placeholder, zero
    /// test cases, malformed bank entry). Fatal for the request, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No injection rule exists for this language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The execution service was unreachable or rejected the submission.
    #[error("failed to dispatch submission: {0}")]
    Dispatch(String),

    /// The submission never left the queued/running states within the poll
    /// budget. The job may simply be slow, not broken.
    #[error("execution timed out after {attempts} status checks")]
    ExecutionTimeout { attempts: u32 },

    /// A referenced test, assignment or question does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The execution service returned a payload we could not decode.
    #[error("malformed execution service response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
