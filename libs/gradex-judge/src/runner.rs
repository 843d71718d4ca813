//! Test case runner: drives dispatch and polling for every hidden test case
//! of a code question and aggregates the verdicts into a [`ScoreReport`].
//!
//! Per-case isolation is the core rule here — a dispatch failure or timeout
//! on one case becomes a failed result for that case and never aborts the
//! rest of the batch. Only configuration problems (no test cases, missing
//! harness or placeholder) fail the whole run, and they do so before a
//! single job is dispatched.

use futures_util::stream::{self, StreamExt};
use gradex_common::types::{Language, Question, ScoreReport, TestCase, TestCaseResult};
use gradex_common::{Error, Result};
use tracing::{info, warn};

use crate::client::{await_result, ExecutionBackend, ExecutionOutcome};
use crate::config::RunnerConfig;
use crate::inject;

pub struct Runner<B> {
    backend: B,
    config: RunnerConfig,
}

impl<B: ExecutionBackend> Runner<B> {
    pub fn new(backend: B, config: RunnerConfig) -> Self {
        Self { backend, config }
    }

    /// Run a student's code against every test case of a code question.
    ///
    /// Test cases are independent, so up to `config.concurrency` of them are
    /// in flight at once; the report's `results` always preserve question
    /// order so feedback stays deterministic.
    pub async fn run(
        &self,
        student_code: &str,
        language: Language,
        question: &Question,
    ) -> Result<ScoreReport> {
        if question.test_cases.is_empty() {
            return Err(Error::Configuration(
                "question has no test cases".to_string(),
            ));
        }

        let harness = question.harness(language).ok_or_else(|| {
            Error::Configuration(format!("question has no validation program for {language}"))
        })?;

        // A broken harness surfaces here, before any dispatch.
        let source = inject::compose_source(student_code, harness, language)?;

        let mut futures = Vec::with_capacity(question.test_cases.len());
        for case in &question.test_cases {
            futures.push(self.run_case(&source, language, case));
        }
        let results: Vec<TestCaseResult> = stream::iter(futures)
            .buffered(self.config.concurrency_or_default())
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.passed).count();
        let total = results.len();
        let score = ((100.0 * passed as f64) / total as f64).round() as u32;
        let max_time_secs = results.iter().map(|r| r.time_secs).fold(0.0, f64::max);

        info!(%language, passed, total, score, "submission scored");

        Ok(ScoreReport {
            results,
            score,
            max_time_secs,
        })
    }

    // Per-case isolation: any pipeline failure for this case becomes a
    // failed result with the error message as feedback.
    async fn run_case(&self, source: &str, language: Language, case: &TestCase) -> TestCaseResult {
        match self.execute_case(source, language, case).await {
            Ok(outcome) => verdict(case, &outcome),
            Err(err) => {
                warn!(%language, error = %err, "test case could not be executed");
                unexecuted(case, err.to_string())
            }
        }
    }

    async fn execute_case(
        &self,
        source: &str,
        language: Language,
        case: &TestCase,
    ) -> Result<ExecutionOutcome> {
        let token = self
            .backend
            .submit(source, language.judge0_id(), &case.input)
            .await?;
        await_result(&self.backend, &token, &self.config.poll).await
    }
}

// The single normalization rule: trim, strip all carriage returns. CRLF vs
// LF must never cause a false failure; nothing else is touched — no
// whitespace collapsing, no case folding.
fn normalize(text: &str) -> String {
    text.replace('\r', "").trim().to_string()
}

fn verdict(case: &TestCase, outcome: &ExecutionOutcome) -> TestCaseResult {
    let expected = normalize(&case.output);
    let actual = normalize(&outcome.stdout);
    let passed = actual == expected;

    let error = if !outcome.stderr.is_empty() {
        outcome.stderr.clone()
    } else {
        outcome.compile_output.clone()
    };

    let time_secs = outcome
        .time
        .as_deref()
        .and_then(|t| t.parse::<f64>().ok())
        .unwrap_or(0.0);

    TestCaseResult {
        passed,
        input: case.input.clone(),
        expected,
        actual,
        time_secs,
        error,
        full_output: outcome.stdout.clone(),
    }
}

fn unexecuted(case: &TestCase, message: String) -> TestCaseResult {
    TestCaseResult {
        passed: false,
        input: case.input.clone(),
        expected: normalize(&case.output),
        actual: String::new(),
        time_secs: 0.0,
        error: message,
        full_output: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{StatusInfo, SubmissionStatus};
    use crate::config::PollConfig;
    use async_trait::async_trait;
    use base64::{engine::general_purpose, Engine as _};
    use gradex_common::types::QuestionKind;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted behavior for one test case, keyed by its stdin.
    #[derive(Clone)]
    enum Script {
        /// Terminal result on the first poll.
        Finishes {
            stdout: &'static str,
            stderr: &'static str,
            compile_output: &'static str,
            time: &'static str,
        },
        /// Dispatch is rejected outright.
        RefusesDispatch,
        /// Reports queued/running forever.
        NeverFinishes,
    }

    /// In-memory execution backend: records every submission, replays
    /// scripted outcomes. Tokens are the case's stdin, which is unique per
    /// test case in these fixtures.
    struct FakeBackend {
        scripts: HashMap<String, Script>,
        submissions: Mutex<Vec<(String, u32, String)>>,
    }

    impl FakeBackend {
        fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }

        fn submitted_sources(&self) -> Vec<String> {
            self.submissions
                .lock()
                .unwrap()
                .iter()
                .map(|(source, _, _)| source.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ExecutionBackend for FakeBackend {
        async fn submit(
            &self,
            source_code: &str,
            language_id: u32,
            stdin: &str,
        ) -> gradex_common::Result<String> {
            if let Some(Script::RefusesDispatch) = self.scripts.get(stdin) {
                return Err(Error::Dispatch("connection refused".to_string()));
            }
            self.submissions.lock().unwrap().push((
                source_code.to_string(),
                language_id,
                stdin.to_string(),
            ));
            Ok(stdin.to_string())
        }

        async fn fetch(&self, token: &str) -> gradex_common::Result<SubmissionStatus> {
            let script = self
                .scripts
                .get(token)
                .unwrap_or_else(|| panic!("no script for token {token:?}"));
            let status = match script {
                Script::NeverFinishes => SubmissionStatus {
                    stdout: None,
                    stderr: None,
                    compile_output: None,
                    time: None,
                    status: StatusInfo {
                        id: 2,
                        description: "Processing".to_string(),
                    },
                },
                Script::Finishes {
                    stdout,
                    stderr,
                    compile_output,
                    time,
                } => SubmissionStatus {
                    stdout: encode(stdout),
                    stderr: encode(stderr),
                    compile_output: encode(compile_output),
                    time: if time.is_empty() {
                        None
                    } else {
                        Some(time.to_string())
                    },
                    status: StatusInfo {
                        id: 3,
                        description: "Accepted".to_string(),
                    },
                },
                Script::RefusesDispatch => unreachable!("dispatch never succeeded"),
            };
            Ok(status)
        }
    }

    // The wire carries base64; the fake encodes so the decode path is
    // exercised on every test.
    fn encode(text: &str) -> Option<String> {
        if text.is_empty() {
            None
        } else {
            Some(general_purpose::STANDARD.encode(text))
        }
    }

    fn passing(input: &'static str, stdout: &'static str) -> (&'static str, Script) {
        (
            input,
            Script::Finishes {
                stdout,
                stderr: "",
                compile_output: "",
                time: "0.01",
            },
        )
    }

    fn code_question(cases: &[(&str, &str)]) -> Question {
        let mut q = Question {
            id: Some("q1".to_string()),
            kind: QuestionKind::Code,
            prompt: String::new(),
            points: 1.0,
            options: Vec::new(),
            correct_option: None,
            correct_answer: None,
            code_template: None,
            validation_programs: HashMap::new(),
            test_cases: cases
                .iter()
                .map(|(input, output)| TestCase {
                    input: input.to_string(),
                    output: output.to_string(),
                    description: None,
                })
                .collect(),
        };
        q.validation_programs.insert(
            "python".to_string(),
            "a, b = map(int, input().split())\nprint(multiply(a, b))".to_string(),
        );
        q.validation_programs.insert(
            "java".to_string(),
            "public class Main {\n{{USER_CODE}}\n}".to_string(),
        );
        q
    }

    fn runner(backend: FakeBackend) -> Runner<FakeBackend> {
        Runner::new(
            backend,
            RunnerConfig {
                poll: PollConfig {
                    interval: Duration::ZERO,
                    max_attempts: 3,
                },
                concurrency: 2,
            },
        )
    }

    #[tokio::test]
    async fn test_all_passing_cases_score_100() {
        let backend = FakeBackend::new(vec![passing("2 3", "6.0"), passing("4 5", "20.0")]);
        let question = code_question(&[("2 3", "6.0"), ("4 5", "20.0")]);

        let report = runner(backend)
            .run("def multiply(a, b):\n    return a * b", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(report.score, 100);
        assert_eq!(report.total(), 2);
        assert!(report.results.iter().all(|r| r.passed));
        assert_eq!(report.results[0].actual, "6.0");
    }

    #[tokio::test]
    async fn test_score_is_rounded_fraction_of_passing_cases() {
        let backend = FakeBackend::new(vec![
            passing("1", "1"),
            passing("2", "wrong"),
            passing("3", "also wrong"),
        ]);
        let question = code_question(&[("1", "1"), ("2", "2"), ("3", "3")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        // 1 of 3 → round(33.33) = 33
        assert_eq!(report.score, 33);
        assert_eq!(report.passed_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_test_cases_is_configuration_error() {
        let backend = FakeBackend::new(vec![]);
        let question = code_question(&[]);

        let err = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_placeholder_fails_fast_with_zero_dispatches() {
        let backend = FakeBackend::new(vec![passing("1", "1")]);
        let mut question = code_question(&[("1", "1")]);
        question
            .validation_programs
            .insert("java".to_string(), "public class Main {}".to_string());

        let runner = runner(backend);
        let err = runner
            .run("code", Language::Java, &question)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(runner.backend.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_harness_is_configuration_error() {
        let backend = FakeBackend::new(vec![]);
        let mut question = code_question(&[("1", "1")]);
        question.validation_programs.clear();

        let err = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_language_without_injection_rule_dispatches_nothing() {
        let backend = FakeBackend::new(vec![]);
        let mut question = code_question(&[("1", "1")]);
        question
            .validation_programs
            .insert("c".to_string(), "harness".to_string());

        let runner = runner(backend);
        let err = runner.run("code", Language::C, &question).await.unwrap_err();

        assert!(matches!(err, Error::UnsupportedLanguage(_)));
        assert_eq!(runner.backend.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_dispatch_never_aborts_the_batch() {
        let backend = FakeBackend::new(vec![
            passing("1", "1"),
            ("2", Script::RefusesDispatch),
            passing("3", "3"),
        ]);
        let question = code_question(&[("1", "1"), ("2", "2"), ("3", "3")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.score, 67);
        // Order follows the question, not completion.
        assert_eq!(report.results[1].input, "2");
        assert!(!report.results[1].passed);
        assert_eq!(report.results[1].actual, "");
        assert!(report.results[1].error.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_job_stuck_in_pending_is_a_failed_case_not_an_abort() {
        let backend = FakeBackend::new(vec![("1", Script::NeverFinishes), passing("2", "2")]);
        let question = code_question(&[("1", "1"), ("2", "2")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(report.total(), 2);
        assert!(!report.results[0].passed);
        assert!(report.results[0].error.contains("timed out after 3"));
        assert!(report.results[1].passed);
        assert_eq!(report.score, 50);
    }

    #[tokio::test]
    async fn test_crlf_differences_never_fail_a_case() {
        let backend = FakeBackend::new(vec![(
            "1",
            Script::Finishes {
                stdout: "line1\r\nline2\r\n",
                stderr: "",
                compile_output: "",
                time: "0.01",
            },
        )]);
        let question = code_question(&[("1", "line1\nline2")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert!(report.results[0].passed);
        // Untrimmed service output is preserved alongside.
        assert_eq!(report.results[0].full_output, "line1\r\nline2\r\n");
    }

    #[tokio::test]
    async fn test_no_other_normalization_is_applied() {
        let backend = FakeBackend::new(vec![passing("1", "Hello  World")]);
        let question = code_question(&[("1", "hello world")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        // Case and interior whitespace still matter.
        assert!(!report.results[0].passed);
    }

    #[tokio::test]
    async fn test_error_field_prefers_stderr_over_compile_output() {
        let backend = FakeBackend::new(vec![
            (
                "1",
                Script::Finishes {
                    stdout: "",
                    stderr: "Traceback: NameError",
                    compile_output: "ignored",
                    time: "0.01",
                },
            ),
            (
                "2",
                Script::Finishes {
                    stdout: "",
                    stderr: "",
                    compile_output: "error: expected ';'",
                    time: "",
                },
            ),
        ]);
        let question = code_question(&[("1", "1"), ("2", "2")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(report.results[0].error, "Traceback: NameError");
        assert_eq!(report.results[1].error, "error: expected ';'");
        assert_eq!(report.score, 0);
    }

    #[tokio::test]
    async fn test_execution_time_is_max_and_unparseable_defaults_to_zero() {
        let backend = FakeBackend::new(vec![
            (
                "1",
                Script::Finishes {
                    stdout: "1",
                    stderr: "",
                    compile_output: "",
                    time: "0.12",
                },
            ),
            (
                "2",
                Script::Finishes {
                    stdout: "2",
                    stderr: "",
                    compile_output: "",
                    time: "not a number",
                },
            ),
        ]);
        let question = code_question(&[("1", "1"), ("2", "2")]);

        let report = runner(backend)
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(report.results[1].time_secs, 0.0);
        assert_eq!(report.max_time_secs, 0.12);
    }

    #[tokio::test]
    async fn test_java_submission_carries_injected_source() {
        let backend = FakeBackend::new(vec![passing("1", "1")]);
        let question = code_question(&[("1", "1")]);

        let runner = runner(backend);
        runner
            .run("int f() { return 1; }", Language::Java, &question)
            .await
            .unwrap();

        let sources = runner.backend.submitted_sources();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].contains("int f() { return 1; }"));
        assert!(!sources[0].contains("{{USER_CODE}}"));
    }

    #[tokio::test]
    async fn test_identical_inputs_yield_identical_reports() {
        let question = code_question(&[("2 3", "6.0"), ("9 9", "81")]);
        let scripts = || vec![passing("2 3", "6.0"), passing("9 9", "80")];

        let first = runner(FakeBackend::new(scripts()))
            .run("code", Language::Python, &question)
            .await
            .unwrap();
        let second = runner(FakeBackend::new(scripts()))
            .run("code", Language::Python, &question)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.score, 50);
    }

    #[tokio::test]
    async fn test_sequential_config_preserves_behavior() {
        let backend = FakeBackend::new(vec![passing("1", "1"), passing("2", "2")]);
        let question = code_question(&[("1", "1"), ("2", "2")]);

        let runner = Runner::new(
            backend,
            RunnerConfig {
                poll: PollConfig {
                    interval: Duration::ZERO,
                    max_attempts: 3,
                },
                concurrency: 1,
            },
        );

        let report = runner.run("code", Language::Python, &question).await.unwrap();
        assert_eq!(report.score, 100);
        assert_eq!(report.results[0].input, "1");
        assert_eq!(report.results[1].input, "2");
    }
}
