//! Recomputes the derived per-ticker aggregates in bounded batches.
//!
//! Each ticker is an independent single-row update, so a crash mid-run loses
//! nothing; the next run recomputes everything.

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::{DIVIDEND_WINDOW_MONTHS, INSIDER_WINDOW_DAYS, METRICS_BATCH_SIZE};
use crate::error::Result;

/// Recompute both aggregates for every ticker at `now`. Returns the number
/// of tickers updated.
pub async fn compute_ticker_metrics(pool: &SqlitePool, now: DateTime<Utc>) -> Result<usize> {
    let today = now.date_naive();
    let dividend_window_start = today - Months::new(DIVIDEND_WINDOW_MONTHS);
    let insider_window_start = (today - Duration::days(INSIDER_WINDOW_DAYS))
        .and_time(NaiveTime::MIN)
        .and_utc();

    let mut updated = 0usize;
    let mut last_symbol = String::new();

    loop {
        let batch: Vec<String> = sqlx::query_scalar(
            "SELECT symbol FROM tickers WHERE symbol > ? ORDER BY symbol LIMIT ?",
        )
        .bind(&last_symbol)
        .bind(METRICS_BATCH_SIZE)
        .fetch_all(pool)
        .await?;

        let Some(last) = batch.last().cloned() else {
            break;
        };

        for symbol in &batch {
            // Sum over the trailing twelve months divided by twelve, so a
            // ticker with no dividends in the window lands at 0, not NULL.
            let dividend_sum: f64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(amount), 0.0) FROM dividend_records \
                 WHERE ticker = ? AND ex_date >= ?",
            )
            .bind(symbol)
            .bind(dividend_window_start)
            .fetch_one(pool)
            .await?;
            let avg_yield = round2(dividend_sum / f64::from(DIVIDEND_WINDOW_MONTHS));

            let insider_buys: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM form4_records \
                 WHERE ticker = ? AND transaction_type = 'Buy' AND filed_at >= ?",
            )
            .bind(symbol)
            .bind(insider_window_start)
            .fetch_one(pool)
            .await?;

            sqlx::query(
                "UPDATE tickers SET avg_dividend_yield = ?, insider_buys_90d = ? WHERE symbol = ?",
            )
            .bind(avg_yield)
            .bind(insider_buys)
            .bind(symbol)
            .execute(pool)
            .await?;
            updated += 1;
        }

        if (batch.len() as i64) < METRICS_BATCH_SIZE {
            break;
        }
        last_symbol = last;
    }

    info!(tickers = updated, "ticker metrics recomputed");
    Ok(updated)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
