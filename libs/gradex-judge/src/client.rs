//! Client for the external Judge0-compatible execution service.
//!
//! The service is a black box reached over HTTP: submissions go in with
//! base64-encoded source and stdin, an opaque token comes back, and results
//! are fetched by token until the job leaves the queued/running states.
//!
//! The [`ExecutionBackend`] trait is the seam between orchestration and
//! transport — the runner drives any backend the same way, which is also how
//! the scoring logic gets exercised in tests without a live service.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use gradex_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PollConfig;

// Submission status ids of the execution service. 1 and 2 mean the job has
// not reached a verdict yet; everything else is terminal.
const STATUS_IN_QUEUE: u32 = 1;
const STATUS_PROCESSING: u32 = 2;

#[derive(Debug, Serialize)]
struct SubmissionBody {
    source_code: String,
    language_id: u32,
    stdin: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Raw status payload as the service returns it; the three output fields are
/// still base64 at this point.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionStatus {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    pub status: StatusInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusInfo {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

impl SubmissionStatus {
    pub fn is_pending(&self) -> bool {
        self.status.id == STATUS_IN_QUEUE || self.status.id == STATUS_PROCESSING
    }
}

/// Decoded terminal result of one submission.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    /// Wall-clock seconds as reported by the service, unparsed.
    pub time: Option<String>,
    pub status_id: u32,
    pub status_description: String,
}

/// Transport seam: submit a job, fetch its status by token.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submit one execution job; returns the service's opaque token.
    async fn submit(&self, source_code: &str, language_id: u32, stdin: &str) -> Result<String>;

    /// Fetch the current status of a submission.
    async fn fetch(&self, token: &str) -> Result<SubmissionStatus>;
}

/// reqwest-based backend for a real Judge0-compatible deployment.
pub struct JudgeClient {
    base_url: String,
    http: reqwest::Client,
}

impl JudgeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ExecutionBackend for JudgeClient {
    async fn submit(&self, source_code: &str, language_id: u32, stdin: &str) -> Result<String> {
        let url = format!("{}/submissions?base64_encoded=true&wait=false", self.base_url);
        // The wire contract requires base64 so arbitrary text — control
        // characters, the service's own delimiters — travels safely.
        let body = SubmissionBody {
            source_code: general_purpose::STANDARD.encode(source_code),
            language_id,
            stdin: general_purpose::STANDARD.encode(stdin),
        };

        // Exactly one request per invocation; waiting and retrying belong to
        // the poller, and a failed dispatch belongs to the caller.
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Dispatch(format!(
                "execution service returned {}",
                response.status()
            )));
        }

        let TokenResponse { token } = response
            .json()
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        debug!(token = %token, language_id, "submission dispatched");
        Ok(token)
    }

    async fn fetch(&self, token: &str) -> Result<SubmissionStatus> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=true&fields=*",
            self.base_url, token
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Dispatch(format!(
                "execution service returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Wait for a submission to reach a terminal status.
///
/// Strictly sequential wait-then-check: sleep one interval, fetch, repeat up
/// to `poll.max_attempts` times. A job still queued/running after the last
/// attempt is an [`Error::ExecutionTimeout`] — distinct from an execution
/// error, the job may simply be slow. Dropping the returned future abandons
/// the wait mid-sleep; nothing leaks.
pub async fn await_result<B: ExecutionBackend + ?Sized>(
    backend: &B,
    token: &str,
    poll: &PollConfig,
) -> Result<ExecutionOutcome> {
    for attempt in 1..=poll.max_attempts {
        tokio::time::sleep(poll.interval).await;

        let status = backend.fetch(token).await?;
        if status.is_pending() {
            debug!(token = %token, attempt, status_id = status.status.id, "still pending");
            continue;
        }
        return decode_outcome(status);
    }

    warn!(token = %token, attempts = poll.max_attempts, "submission never left pending state");
    Err(Error::ExecutionTimeout {
        attempts: poll.max_attempts,
    })
}

fn decode_outcome(status: SubmissionStatus) -> Result<ExecutionOutcome> {
    Ok(ExecutionOutcome {
        stdout: decode_field(status.stdout.as_deref())?,
        stderr: decode_field(status.stderr.as_deref())?,
        compile_output: decode_field(status.compile_output.as_deref())?,
        time: status.time,
        status_id: status.status.id,
        status_description: status.status.description,
    })
}

// The service line-wraps long base64 payloads; strip ASCII whitespace before
// decoding.
fn decode_field(field: Option<&str>) -> Result<String> {
    let Some(raw) = field else {
        return Ok(String::new());
    };
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: u32) -> SubmissionStatus {
        SubmissionStatus {
            stdout: None,
            stderr: None,
            compile_output: None,
            time: None,
            status: StatusInfo {
                id,
                description: String::new(),
            },
        }
    }

    #[test]
    fn test_pending_states() {
        assert!(status(1).is_pending());
        assert!(status(2).is_pending());
        assert!(!status(3).is_pending());
        assert!(!status(6).is_pending());
        assert!(!status(13).is_pending());
    }

    #[test]
    fn test_decode_field_handles_line_wrapped_base64() {
        let encoded = general_purpose::STANDARD.encode("hello world");
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        assert_eq!(decode_field(Some(&wrapped)).unwrap(), "hello world");
    }

    #[test]
    fn test_decode_field_absent_is_empty() {
        assert_eq!(decode_field(None).unwrap(), "");
    }

    #[test]
    fn test_decode_field_rejects_garbage() {
        assert!(matches!(
            decode_field(Some("not base64!!!")),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_status_payload_shape() {
        let status: SubmissionStatus = serde_json::from_str(
            r#"{
                "stdout": "Ni4wCg==",
                "stderr": null,
                "compile_output": null,
                "time": "0.002",
                "status": {"id": 3, "description": "Accepted"}
            }"#,
        )
        .unwrap();
        assert!(!status.is_pending());
        let outcome = decode_outcome(status).unwrap();
        assert_eq!(outcome.stdout, "6.0\n");
        assert_eq!(outcome.time.as_deref(), Some("0.002"));
        assert_eq!(outcome.status_description, "Accepted");
    }
}
