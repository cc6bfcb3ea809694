//! Built-in scanners available without user-defined criteria. Both read the
//! derived ticker aggregates maintained by the metrics job rather than
//! running the criteria compiler.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::config::HIGH_DIVIDEND_MIN_YIELD;
use crate::error::Result;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CannedMatch {
    pub symbol: String,
    pub avg_dividend_yield: Option<f64>,
    pub insider_buys_90d: Option<i64>,
}

/// Tickers with a stored trailing-12-month yield of at least 4.0.
pub async fn high_dividend(pool: &SqlitePool) -> Result<Vec<CannedMatch>> {
    let rows = sqlx::query_as::<_, CannedMatch>(
        "SELECT symbol, avg_dividend_yield, insider_buys_90d FROM tickers \
         WHERE avg_dividend_yield >= ? ORDER BY avg_dividend_yield DESC",
    )
    .bind(HIGH_DIVIDEND_MIN_YIELD)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Tickers with any insider buys in the trailing 90-day window.
pub async fn insider_activity(pool: &SqlitePool) -> Result<Vec<CannedMatch>> {
    let rows = sqlx::query_as::<_, CannedMatch>(
        "SELECT symbol, avg_dividend_yield, insider_buys_90d FROM tickers \
         WHERE insider_buys_90d > 0 ORDER BY insider_buys_90d DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;

    async fn add_ticker(pool: &SqlitePool, symbol: &str, yield_: Option<f64>, buys: Option<i64>) {
        sqlx::query(
            "INSERT INTO tickers (symbol, name, avg_dividend_yield, insider_buys_90d) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(symbol)
        .bind(symbol)
        .bind(yield_)
        .bind(buys)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn high_dividend_threshold_is_inclusive() {
        let pool = test_pool().await;
        add_ticker(&pool, "RICH", Some(5.0), Some(0)).await;
        add_ticker(&pool, "ALMOST", Some(3.9), Some(0)).await;
        add_ticker(&pool, "EDGE", Some(4.0), Some(0)).await;
        add_ticker(&pool, "FRESH", None, None).await;

        let rows = high_dividend(&pool).await.unwrap();
        let symbols: Vec<_> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["RICH", "EDGE"]);
    }

    #[tokio::test]
    async fn insider_activity_requires_at_least_one_buy() {
        let pool = test_pool().await;
        add_ticker(&pool, "BUSY", Some(0.0), Some(3)).await;
        add_ticker(&pool, "QUIET", Some(0.0), Some(0)).await;
        add_ticker(&pool, "FRESH", None, None).await;

        let rows = insider_activity(&pool).await.unwrap();
        let symbols: Vec<_> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BUSY"]);
    }
}
