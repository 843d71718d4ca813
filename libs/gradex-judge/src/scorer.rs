//! Cross-type answer reconciliation for final test/assignment submission.
//!
//! Every question's verdict is computed server-side at submit time. The
//! client payload carries answer text only — for code questions the points
//! come from a [`ScoreReport`] the server produced by running the pipeline,
//! never from a client-claimed score.

use gradex_common::types::{
    AnswerRecord, Question, QuestionKind, ScoreReport, SubmissionGrade, SubmittedAnswer,
};
use gradex_common::{Error, Result};
use std::collections::HashMap;
use tracing::info;

/// Key a question is addressed by: its id, or its position as a string for
/// legacy records without one.
pub fn question_key(question: &Question, index: usize) -> String {
    question
        .id
        .clone()
        .unwrap_or_else(|| index.to_string())
}

/// Reconcile one question against its submitted answer.
///
/// mcq and fill are all-or-nothing; code earns fractional credit from the
/// server-computed report.
pub fn score_answer(
    question: &Question,
    key: &str,
    submitted: Option<&SubmittedAnswer>,
    code_report: Option<&ScoreReport>,
) -> AnswerRecord {
    let answer = submitted.map(|s| s.answer.as_str()).unwrap_or_default();

    match question.kind {
        QuestionKind::Mcq => score_mcq(question, key, answer),
        QuestionKind::Fill => score_fill(question, key, answer),
        QuestionKind::Code => score_code(question, key, answer, code_report),
    }
}

fn score_mcq(question: &Question, key: &str, answer: &str) -> AnswerRecord {
    let correct_text = question
        .correct_option
        .and_then(|i| question.options.get(i))
        .cloned();

    // The submitted answer may be the option's text or its index.
    let correct = match (&correct_text, question.correct_option) {
        (Some(text), Some(index)) => {
            answer == text.as_str() || answer.trim().parse::<usize>() == Ok(index)
        }
        _ => false,
    };

    AnswerRecord {
        question_id: key.to_string(),
        answer: answer.to_string(),
        correct,
        points: if correct { question.points } else { 0.0 },
        feedback: if correct { "Correct" } else { "Incorrect" }.to_string(),
        correct_answer: correct_text,
    }
}

fn score_fill(question: &Question, key: &str, answer: &str) -> AnswerRecord {
    let expected = question.correct_answer.clone();
    let correct = expected
        .as_deref()
        .is_some_and(|e| e.trim().eq_ignore_ascii_case(answer.trim()));

    AnswerRecord {
        question_id: key.to_string(),
        answer: answer.to_string(),
        correct,
        points: if correct { question.points } else { 0.0 },
        feedback: if correct { "Correct" } else { "Incorrect" }.to_string(),
        correct_answer: expected,
    }
}

fn score_code(
    question: &Question,
    key: &str,
    answer: &str,
    report: Option<&ScoreReport>,
) -> AnswerRecord {
    let Some(report) = report.filter(|r| r.total() > 0) else {
        return AnswerRecord {
            question_id: key.to_string(),
            answer: answer.to_string(),
            correct: false,
            points: 0.0,
            feedback: "No code provided".to_string(),
            correct_answer: None,
        };
    };

    let passed = report.passed_count();
    let total = report.total();
    let points = question.points * passed as f64 / total as f64;

    AnswerRecord {
        question_id: key.to_string(),
        answer: answer.to_string(),
        correct: passed == total,
        points,
        feedback: format!("Passed {passed}/{total} test cases"),
        correct_answer: None,
    }
}

/// Grade a whole submission attempt.
///
/// `reports` holds the server-computed score reports for the code questions,
/// keyed like the answers (question id, or positional index as a string).
pub fn grade_submission(
    questions: &[Question],
    answers: &[SubmittedAnswer],
    reports: &HashMap<String, ScoreReport>,
) -> Result<SubmissionGrade> {
    let available_points: f64 = questions.iter().map(|q| q.points).sum();
    if questions.is_empty() || available_points <= 0.0 {
        return Err(Error::Configuration(
            "submission has no gradable points".to_string(),
        ));
    }

    let by_id: HashMap<&str, &SubmittedAnswer> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();

    let records: Vec<AnswerRecord> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let key = question_key(question, index);
            score_answer(
                question,
                &key,
                by_id.get(key.as_str()).copied(),
                reports.get(&key),
            )
        })
        .collect();

    let earned_points: f64 = records.iter().map(|r| r.points).sum();
    let percentage = (100.0 * earned_points / available_points)
        .round()
        .clamp(0.0, 100.0) as u32;

    info!(earned_points, available_points, percentage, "submission graded");

    Ok(SubmissionGrade {
        records,
        earned_points,
        available_points,
        percentage,
    })
}
