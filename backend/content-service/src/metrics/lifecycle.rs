//! Prometheus metrics for the ephemeral content lifecycle
//!
//! Tracks content creation, story views, expiry-flag drift and the
//! reconcile job.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::time::Duration;

/// Content created, by kind (post/story)
static CONTENT_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ephemeral_content_created_total",
        "Total ephemeral content records created",
        &["kind"]
    )
    .expect("failed to register ephemeral_content_created_total")
});

/// Story view calls, by outcome (recorded/duplicate)
static STORY_VIEWS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "story_views_total",
        "Story view calls segmented by ledger outcome",
        &["outcome"]
    )
    .expect("failed to register story_views_total")
});

/// Reads that returned a post whose cached flag disagrees with its expiry
static EXPIRY_FLAG_DRIFT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "expiry_flag_drift_total",
        "Posts served whose is_expired flag disagreed with expires_at",
        &["source"]
    )
    .expect("failed to register expiry_flag_drift_total")
});

/// Reconcile cycles (success/error)
static RECONCILE_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "expiry_reconcile_runs_total",
        "Total expiry reconcile cycles (success/error)",
        &["status"]
    )
    .expect("failed to register expiry_reconcile_runs_total")
});

static RECONCILE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "expiry_reconcile_duration_seconds",
        "Duration of expiry reconcile cycles",
        &["status"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    )
    .expect("failed to register expiry_reconcile_duration_seconds")
});

/// Posts flagged expired in the last reconcile cycle
static RECONCILE_FLAGGED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "expiry_reconcile_flagged_posts",
        "Posts flagged expired in the last reconcile cycle"
    )
    .expect("failed to register expiry_reconcile_flagged_posts")
});

/// Posts flagged expired while still time-visible, as of the last cycle
static PREMATURE_FLAGS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "expiry_premature_flags",
        "Posts flagged expired before their expires_at"
    )
    .expect("failed to register expiry_premature_flags")
});

pub fn record_content_created(kind: &str) {
    CONTENT_CREATED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_story_view(recorded: bool) {
    let outcome = if recorded { "recorded" } else { "duplicate" };
    STORY_VIEWS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_flag_drift(source: &str) {
    EXPIRY_FLAG_DRIFT_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_reconcile_run(status: &str, duration: Duration) {
    RECONCILE_RUNS_TOTAL.with_label_values(&[status]).inc();
    RECONCILE_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration.as_secs_f64());
}

pub fn set_reconcile_counts(flagged: u64, premature: u64) {
    RECONCILE_FLAGGED.set(flagged as i64);
    PREMATURE_FLAGS.set(premature as i64);
}
