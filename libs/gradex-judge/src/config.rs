// Runtime tunables for the pipeline. Everything here is injectable so tests
// can shrink timeouts without sleeping real seconds.

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:2358";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_CONCURRENCY: usize = 4;

/// How long and how often to wait for a submission to finish.
///
/// The per-case latency budget is `interval * max_attempts` (10s with the
/// defaults); a submission still pending after that is reported as a timeout.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Runner behavior: polling plus how many test cases may be in flight at
/// once. `concurrency = 1` restores strictly sequential execution; the
/// report's order is the question's order either way.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub poll: PollConfig,
    pub concurrency: usize,
}

impl RunnerConfig {
    pub fn concurrency_or_default(&self) -> usize {
        if self.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        }
    }
}

/// Full pipeline configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Base URL of the Judge0-compatible execution service.
    pub base_url: String,
    pub runner: RunnerConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            runner: RunnerConfig::default(),
        }
    }
}

impl JudgeConfig {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// Variables: `JUDGE_URL`, `JUDGE_POLL_INTERVAL_MS`,
    /// `JUDGE_MAX_POLL_ATTEMPTS`, `JUDGE_CONCURRENCY`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("JUDGE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let interval_ms = env_parse("JUDGE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        let max_attempts = env_parse("JUDGE_MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS);
        let concurrency = env_parse("JUDGE_CONCURRENCY", DEFAULT_CONCURRENCY);

        Self {
            base_url,
            runner: RunnerConfig {
                poll: PollConfig {
                    interval: Duration::from_millis(interval_ms),
                    max_attempts,
                },
                concurrency,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
