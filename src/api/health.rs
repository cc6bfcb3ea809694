//! Shared health state for the /health endpoint.
//! Updated by the job scheduler loops, read by the API.

use std::sync::atomic::{AtomicI64, Ordering};

/// Last-completed-run timestamps (unix seconds, 0 = never) for each job loop.
#[derive(Default)]
pub struct HealthState {
    pub last_metrics_run: AtomicI64,
    pub last_scanner_run: AtomicI64,
    pub last_alert_run: AtomicI64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_metrics_run(&self, ts: i64) {
        self.last_metrics_run.store(ts, Ordering::Relaxed);
    }

    pub fn set_last_scanner_run(&self, ts: i64) {
        self.last_scanner_run.store(ts, Ordering::Relaxed);
    }

    pub fn set_last_alert_run(&self, ts: i64) {
        self.last_alert_run.store(ts, Ordering::Relaxed);
    }

    pub fn last_metrics_run(&self) -> i64 {
        self.last_metrics_run.load(Ordering::Relaxed)
    }

    pub fn last_scanner_run(&self) -> i64 {
        self.last_scanner_run.load(Ordering::Relaxed)
    }

    pub fn last_alert_run(&self) -> i64 {
        self.last_alert_run.load(Ordering::Relaxed)
    }
}
