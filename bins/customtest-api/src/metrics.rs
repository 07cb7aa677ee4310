// Prometheus metrics for the custom test endpoints

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, HistogramOpts,
    IntCounterVec, TextEncoder,
};

const JUDGE0_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0];

lazy_static! {
    // Submissions by outcome: invalid, success, judge_failed, store_failed
    pub static ref SUBMISSIONS: IntCounterVec = register_int_counter_vec!(
        "customtest_submissions_total",
        "Custom test submissions by outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref JUDGE0_LATENCY: Histogram = register_histogram!(
        HistogramOpts::new(
            "customtest_judge0_request_duration_seconds",
            "Latency of calls to the Judge0 API"
        )
        .buckets(JUDGE0_BUCKETS.to_vec())
    )
    .unwrap();
}

pub fn record_outcome(outcome: &str) {
    SUBMISSIONS.with_label_values(&[outcome]).inc();
}

/// Render the default registry in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
