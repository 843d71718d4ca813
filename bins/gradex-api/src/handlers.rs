// HTTP route handlers for the gradex API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gradex_common::types::{Language, QuestionKind, SubmissionGrade, SubmittedAnswer, TestCaseResult};
use gradex_common::Error;
use gradex_judge::scorer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::bank::QuestionSource;
use crate::metrics;
use crate::AppState;

/// Pipeline error as an HTTP response. Configuration problems are the
/// caller's to fix (422), missing entities are 404, everything else is a
/// server fault reported without internals — students never see a raw
/// stack trace.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Configuration(_) | Error::UnsupportedLanguage(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            // Per-case faults are folded into the report by the runner; one
            // reaching here is a bug or a total service outage.
            Error::Dispatch(_) | Error::ExecutionTimeout { .. } | Error::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CompileTestRequest {
    pub code: String,
    #[serde(alias = "languageId")]
    pub language: String,
    #[serde(alias = "testId")]
    pub test_id: String,
    #[serde(alias = "questionId")]
    pub question_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CompileAssignmentRequest {
    pub code: String,
    #[serde(alias = "languageId")]
    pub language: String,
    #[serde(alias = "assignmentId")]
    pub assignment_id: String,
    #[serde(alias = "questionId")]
    pub question_id: String,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    /// Raw stdout of the first test case, for the editor console.
    pub output: String,
    pub test_results: Vec<TestCaseResult>,
    pub score: u32,
    pub execution_time: f64,
}

/// POST /api/compile/test - run a submission against a test question
pub async fn compile_test(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompileTestRequest>,
) -> Result<Json<CompileResponse>, ApiError> {
    compile(
        &state,
        state.tests.as_ref(),
        &payload.code,
        &payload.language,
        &payload.test_id,
        &payload.question_id,
    )
    .await
}

/// POST /api/compile/assignment - run a submission against an assignment question
pub async fn compile_assignment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompileAssignmentRequest>,
) -> Result<Json<CompileResponse>, ApiError> {
    compile(
        &state,
        state.assignments.as_ref(),
        &payload.code,
        &payload.language,
        &payload.assignment_id,
        &payload.question_id,
    )
    .await
}

// Both endpoints share one pipeline; they differ only in which bank supplies
// the question.
async fn compile(
    state: &AppState,
    source: &dyn QuestionSource,
    code: &str,
    language: &str,
    container_id: &str,
    question_id: &str,
) -> Result<Json<CompileResponse>, ApiError> {
    metrics::COMPILE_REQUESTS
        .with_label_values(&[source.kind()])
        .inc();

    let language = parse_language(language)?;
    let question = source.find_question(container_id, question_id).await?;
    if question.kind != QuestionKind::Code {
        return Err(Error::Configuration(format!(
            "question {question_id} is not a code question"
        ))
        .into());
    }

    info!(
        source = source.kind(),
        container_id,
        question_id,
        %language,
        "running submission"
    );

    let report = state.runner.run(code, language, &question).await?;
    metrics::record_verdicts(&report.results);

    Ok(Json(CompileResponse {
        output: report
            .results
            .first()
            .map(|r| r.full_output.clone())
            .unwrap_or_default(),
        score: report.score,
        execution_time: report.max_time_secs,
        test_results: report.results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    #[serde(alias = "testId")]
    pub test_id: String,
    #[serde(default)]
    pub answers: Vec<GradeAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct GradeAnswer {
    #[serde(alias = "questionId")]
    pub question_id: String,
    /// Option text, fill text, or the code itself for code questions.
    #[serde(default)]
    pub answer: String,
    /// Required for code questions only.
    #[serde(default)]
    pub language: Option<String>,
}

/// POST /api/submissions/grade - final submission reconciliation
///
/// Code verdicts are recomputed here by running the pipeline; the client
/// payload never carries a score we would have to trust.
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionGrade>, ApiError> {
    metrics::GRADE_REQUESTS.inc();

    let questions = state.tests.questions(&payload.test_id).await?;

    let mut reports = HashMap::new();
    for (index, question) in questions.iter().enumerate() {
        if question.kind != QuestionKind::Code {
            continue;
        }
        let key = scorer::question_key(question, index);
        let Some(answer) = payload.answers.iter().find(|a| a.question_id == key) else {
            continue;
        };
        if answer.answer.trim().is_empty() {
            continue;
        }
        // No usable language means no report; the scorer then awards zero.
        let Some(language) = answer.language.as_deref().and_then(Language::from_name) else {
            continue;
        };

        match state.runner.run(&answer.answer, language, question).await {
            Ok(report) => {
                metrics::record_verdicts(&report.results);
                reports.insert(key, report);
            }
            Err(err @ (Error::Configuration(_) | Error::UnsupportedLanguage(_))) => {
                return Err(err.into());
            }
            Err(err) => {
                error!(question_id = %key, error = %err, "code answer could not be judged");
            }
        }
    }

    let answers: Vec<SubmittedAnswer> = payload
        .answers
        .iter()
        .map(|a| SubmittedAnswer {
            question_id: a.question_id.clone(),
            answer: a.answer.clone(),
        })
        .collect();

    let grade = scorer::grade_submission(&questions, &answers, &reports)?;

    info!(
        test_id = %payload.test_id,
        percentage = grade.percentage,
        "submission graded"
    );

    Ok(Json(grade))
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn parse_language(name: &str) -> Result<Language, ApiError> {
    Language::from_name(name).ok_or_else(|| Error::UnsupportedLanguage(name.to_string()).into())
}
