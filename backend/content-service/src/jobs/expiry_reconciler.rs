//! Expiry Reconcile Background Job
//!
//! Keeps the advisory `posts.is_expired` flag close to what `expires_at`
//! already says. Reads never consult the flag, so this job is optional and
//! a failed cycle only delays the flag.
//!
//! Each cycle:
//! - flags posts whose `expires_at` has passed
//! - counts posts flagged while still time-visible and reports them as drift

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::db::ContentStore;
use crate::error::Result;
use crate::metrics::lifecycle as metrics;

/// Default cadence; overridden by `EXPIRY_RECONCILE_INTERVAL_SECS`.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(300);

/// Outcome of one reconcile cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Posts newly flagged expired.
    pub flagged: u64,
    /// Posts flagged expired that are still inside their lifetime.
    pub premature: u64,
}

#[derive(Clone)]
pub struct ExpiryReconcileJob {
    store: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpiryReconcileJob {
    pub fn new(store: Arc<dyn ContentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        // tokio intervals panic on zero
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the reconcile loop. Intended to be spawned on the Tokio runtime.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry reconcile job started"
        );

        loop {
            ticker.tick().await;
            let cycle_start = std::time::Instant::now();

            match self.run_once().await {
                Ok(report) => {
                    metrics::record_reconcile_run("success", cycle_start.elapsed());
                    debug!(
                        flagged = report.flagged,
                        premature = report.premature,
                        duration_ms = cycle_start.elapsed().as_millis() as u64,
                        "Expiry reconcile cycle completed"
                    );
                }
                Err(e) => {
                    metrics::record_reconcile_run("error", cycle_start.elapsed());
                    error!(error = %e, "Expiry reconcile cycle failed");
                }
            }
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let now = self.clock.now();
        let flagged = self.store.flag_expired_posts(now).await?;
        let premature = self.store.count_premature_flags(now).await?;

        metrics::set_reconcile_counts(flagged, premature);
        if flagged > 0 {
            info!(flagged, "Flagged expired posts");
        }
        if premature > 0 {
            metrics::record_flag_drift("reconciler");
            warn!(
                premature,
                "Posts flagged expired before their expires_at; reads ignore the flag"
            );
        }

        Ok(ReconcileReport { flagged, premature })
    }
}
