//! Runs one alert evaluation pass: every active alert is checked against
//! current data, matches are dispatched, and `last_triggered_at` is stamped
//! only after a successful dispatch so failed sends retry next run.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info, warn};

use crate::alerts::condition::AlertCondition;
use crate::alerts::notify::{Notification, Notifier};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertRunSummary {
    pub evaluated: usize,
    pub triggered: usize,
    /// Alerts with malformed config or unknown type: logged, never matching.
    pub skipped: usize,
    /// Alerts whose notification dispatch (or trigger stamp) failed.
    pub failed: usize,
}

#[derive(Debug, FromRow)]
struct ActiveAlert {
    id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    symbol: Option<String>,
    config: String,
    email: String,
}

/// Evaluate all active alerts at `now`. A failure on one alert never aborts
/// the rest of the pass.
pub async fn process_alerts(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<AlertRunSummary> {
    let alerts = sqlx::query_as::<_, ActiveAlert>(
        "SELECT a.id, a.type, a.symbol, a.config, u.email \
         FROM alerts a JOIN users u ON u.id = a.user_id \
         WHERE a.active = 1 ORDER BY a.id",
    )
    .fetch_all(pool)
    .await?;

    let mut summary = AlertRunSummary {
        evaluated: alerts.len(),
        ..Default::default()
    };

    for alert in &alerts {
        match evaluate(pool, alert, now).await {
            Ok(Some(notification)) => match notifier.dispatch(&alert.email, &notification).await {
                Ok(()) => match stamp_trigger(pool, alert.id, now).await {
                    Ok(()) => {
                        info!(alert_id = alert.id, to = %alert.email, title = %notification.title, "alert triggered");
                        summary.triggered += 1;
                    }
                    Err(e) => {
                        error!(alert_id = alert.id, error = %e, "failed to record trigger time");
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    // last_triggered_at stays untouched so the next run
                    // re-evaluates and retries the send.
                    error!(alert_id = alert.id, error = %e, "notification dispatch failed");
                    summary.failed += 1;
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(alert_id = alert.id, error = %e, "alert misconfigured, treating as non-matching");
                summary.skipped += 1;
            }
        }
    }

    info!(
        evaluated = summary.evaluated,
        triggered = summary.triggered,
        skipped = summary.skipped,
        failed = summary.failed,
        "alert pass complete"
    );
    Ok(summary)
}

async fn stamp_trigger(pool: &SqlitePool, alert_id: i64, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE alerts SET last_triggered_at = ? WHERE id = ?")
        .bind(now)
        .bind(alert_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn evaluate(
    pool: &SqlitePool,
    alert: &ActiveAlert,
    now: DateTime<Utc>,
) -> Result<Option<Notification>> {
    let condition = AlertCondition::parse(&alert.kind, &alert.config)?;
    let Some(symbol) = alert.symbol.as_deref() else {
        warn!(alert_id = alert.id, "alert has no symbol, never matches");
        return Ok(None);
    };
    let today = now.date_naive();

    let notification = match condition {
        AlertCondition::Earnings { days_ahead } => {
            let due = today + Duration::days(days_ahead);
            let hits: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM earnings WHERE symbol = ? AND report_date = ?",
            )
            .bind(symbol)
            .bind(due)
            .fetch_one(pool)
            .await?;
            (hits > 0).then(|| Notification {
                title: "Earnings Coming Up".to_string(),
                body: format!("{symbol} reports earnings on {due}"),
            })
        }
        AlertCondition::Insider { last_days } => {
            // Day-granular window: opens at midnight of today - last_days.
            let since = (today - Duration::days(last_days))
                .and_time(NaiveTime::MIN)
                .and_utc();
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM form4_records WHERE ticker = ? AND filed_at >= ?",
            )
            .bind(symbol)
            .bind(since)
            .fetch_one(pool)
            .await?;
            (count > 0).then(|| Notification {
                title: "Insider Activity".to_string(),
                body: format!("{count} insider trades on {symbol} in last {last_days}d"),
            })
        }
        AlertCondition::Dividend { days_ahead } => {
            let due = today + Duration::days(days_ahead);
            let hits: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM dividend_records WHERE ticker = ? AND ex_date = ?",
            )
            .bind(symbol)
            .bind(due)
            .fetch_one(pool)
            .await?;
            (hits > 0).then(|| Notification {
                title: "Ex-Dividend Alert".to_string(),
                body: format!("{symbol} goes ex-dividend on {due}"),
            })
        }
    };

    Ok(notification)
}
