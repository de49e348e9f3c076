//! Server time source.
//!
//! Expiry stamping and read-time filtering both ask a [`Clock`] for "now".
//! Nothing else in the service calls `Utc::now()` for lifecycle decisions,
//! so a [`ManualClock`] can drive every time-dependent path in tests.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::fmt;
use std::sync::RwLock;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to microseconds, the precision PostgreSQL keeps for
/// `timestamptz`, so a stored `created_at` reads back unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Controllable clock for tests and local simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
