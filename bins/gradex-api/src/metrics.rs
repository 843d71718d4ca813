// Prometheus counters for the compile/grade surface.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref COMPILE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "gradex_compile_requests_total",
        "Compile/run requests received, by question source",
        &["source"]
    )
    .unwrap();
    pub static ref GRADE_REQUESTS: IntCounter = register_int_counter!(
        "gradex_grade_requests_total",
        "Final submission grade requests received"
    )
    .unwrap();
    pub static ref TEST_CASES_JUDGED: IntCounterVec = register_int_counter_vec!(
        "gradex_test_cases_judged_total",
        "Individual test case verdicts produced, by outcome",
        &["outcome"]
    )
    .unwrap();
}

pub fn record_verdicts(results: &[gradex_common::types::TestCaseResult]) {
    for result in results {
        let outcome = if result.passed { "passed" } else { "failed" };
        TEST_CASES_JUDGED.with_label_values(&[outcome]).inc();
    }
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        )
            .into_response(),
    }
}
