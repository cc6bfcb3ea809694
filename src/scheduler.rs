//! Recurring job loops: daily metrics recompute, hourly scanner re-runs,
//! five-minute alert passes.
//!
//! Each job is a single sequential loop, so runs of the same job never
//! overlap within one process. Failures are logged and retried on the next
//! scheduled tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{error, info};

use crate::alerts::{self, notify::Notifier};
use crate::api::health::HealthState;
use crate::config::{ALERT_INTERVAL_SECS, METRICS_INTERVAL_SECS, SCANNER_INTERVAL_SECS};
use crate::error::Result;
use crate::metrics;
use crate::scanner;

pub struct JobScheduler {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    health: Arc<HealthState>,
}

impl JobScheduler {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>, health: Arc<HealthState>) -> Self {
        Self {
            pool,
            notifier,
            health,
        }
    }

    /// Spawn the three loops as independent tasks.
    pub fn spawn(self) {
        let pool = self.pool.clone();
        let health = Arc::clone(&self.health);
        tokio::spawn(async move {
            // First tick fires immediately: the canned scanners need the
            // ticker aggregates before the first daily cadence lands.
            let mut ticker = interval(Duration::from_secs(METRICS_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                match metrics::compute_ticker_metrics(&pool, Utc::now()).await {
                    Ok(updated) => {
                        health.set_last_metrics_run(Utc::now().timestamp());
                        info!(tickers = updated, "metrics job complete");
                    }
                    Err(e) => error!("metrics job failed: {e}"),
                }
            }
        });

        let pool = self.pool.clone();
        let health = Arc::clone(&self.health);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(SCANNER_INTERVAL_SECS));
            ticker.tick().await; // consume immediate first tick
            loop {
                ticker.tick().await;
                if let Err(e) = run_all_scanners(&pool).await {
                    error!("scanner job failed: {e}");
                } else {
                    health.set_last_scanner_run(Utc::now().timestamp());
                }
            }
        });

        let pool = self.pool;
        let notifier = self.notifier;
        let health = self.health;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(ALERT_INTERVAL_SECS));
            ticker.tick().await; // consume immediate first tick
            loop {
                ticker.tick().await;
                match alerts::process_alerts(&pool, notifier.as_ref(), Utc::now()).await {
                    Ok(_) => health.set_last_alert_run(Utc::now().timestamp()),
                    Err(e) => error!("alert job failed: {e}"),
                }
            }
        });
    }
}

/// Run every saved scanner once. A failing scanner (e.g. invalid criteria)
/// does not stop the others.
pub async fn run_all_scanners(pool: &SqlitePool) -> Result<usize> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM scanners ORDER BY id")
        .fetch_all(pool)
        .await?;
    let mut ran = 0usize;
    for id in ids {
        match scanner::run_scanner(pool, id, Utc::now()).await {
            Ok(outcome) => {
                ran += 1;
                info!(scanner_id = id, matched = outcome.matched.len(), "scheduled scan done");
            }
            Err(e) => error!(scanner_id = id, "scheduled scan failed: {e}"),
        }
    }
    Ok(ran)
}
