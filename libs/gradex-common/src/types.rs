use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Languages the execution service can run for us.
///
/// A closed set: adding a language is a compile-time change, not a string
/// that falls through to a default arm at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Java,
    Cpp,
    C,
}

impl Language {
    /// Numeric identifier the execution service assigns to this language.
    /// Total over the enum; the mapping itself can never fail.
    pub fn judge0_id(self) -> u32 {
        match self {
            Language::Python => 71,
            Language::Javascript => 63,
            Language::Java => 62,
            Language::Cpp => 54,
            Language::C => 50,
        }
    }

    /// Parse a human-readable language name. Unknown names are a caller
    /// error and must be rejected before any dispatch.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" => Some(Language::Javascript),
            "java" => Some(Language::Java),
            "cpp" | "c++" => Some(Language::Cpp),
            "c" => Some(Language::C),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Fill,
    Code,
}

/// One hidden test case of a code question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A question as the platform's stores hand it to us. Read-only here.
///
/// Legacy records may lack an `_id`; lookups fall back to the question's
/// position in its container, serialized as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_points")]
    pub points: f64,

    // mcq
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<usize>,

    // fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,

    // code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_template: Option<String>,
    /// Instructor harness per language, keyed by lowercase language name.
    #[serde(default)]
    pub validation_programs: HashMap<String, String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

fn default_points() -> f64 {
    1.0
}

impl Question {
    /// Harness source for the given language, if the instructor provided one.
    pub fn harness(&self, language: Language) -> Option<&str> {
        self.validation_programs.get(language.as_str()).map(String::as_str)
    }
}

/// Verdict for a single test case. Built once by the runner, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub passed: bool,
    pub input: String,
    /// Expected output, trimmed.
    pub expected: String,
    /// Actual stdout, trimmed. Empty when the case could not be executed.
    pub actual: String,
    /// Wall-clock seconds reported by the execution service.
    pub time_secs: f64,
    /// stderr if non-empty, else compiler output, else the pipeline error
    /// that prevented execution.
    pub error: String,
    /// Untrimmed stdout as the service returned it.
    pub full_output: String,
}

/// Aggregate verdict over all test cases of one code question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// One entry per test case, in question order.
    pub results: Vec<TestCaseResult>,
    /// Rounded percentage of passing cases, 0–100.
    pub score: u32,
    /// Maximum per-case execution time.
    pub max_time_secs: f64,
}

impl ScoreReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// What the client submits for one question at final-submission time.
/// Carries the answer text only; points are always computed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    #[serde(default)]
    pub answer: String,
}

/// Reconciled verdict for one question of a submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: String,
    pub correct: bool,
    pub points: f64,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Full grade for one submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionGrade {
    pub records: Vec<AnswerRecord>,
    pub earned_points: f64,
    pub available_points: f64,
    /// Rounded, clamped to 0–100.
    pub percentage: u32,
}
