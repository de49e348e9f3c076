use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, HistogramVec};

/// Request latency by method, matched route pattern and status.
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration segmented by route and status",
        &["method", "route", "status"]
    )
    .expect("failed to register http_request_duration_seconds")
});
