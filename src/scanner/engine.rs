//! Executes a saved scanner: parse criteria, evaluate predicates against
//! per-ticker facts, atomically replace the scanner's result rows.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::Scanner;
use crate::error::{AppError, Result};
use crate::scanner::criteria::{ScannerCriteria, TickerFacts};

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scanner_id: i64,
    pub matched: Vec<String>,
    pub matched_at: DateTime<Utc>,
}

pub async fn fetch_scanner(pool: &SqlitePool, scanner_id: i64) -> Result<Scanner> {
    sqlx::query_as::<_, Scanner>(
        "SELECT id, user_id, name, criteria, created_at, updated_at FROM scanners WHERE id = ?",
    )
    .bind(scanner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ScannerNotFound(scanner_id))
}

/// Run one scanner at `now`. On success the scanner's result set is replaced
/// in a single transaction; on any error the previous results are untouched.
pub async fn run_scanner(
    pool: &SqlitePool,
    scanner_id: i64,
    now: DateTime<Utc>,
) -> Result<ScanOutcome> {
    let scanner = fetch_scanner(pool, scanner_id).await?;
    let criteria = ScannerCriteria::from_str(&scanner.criteria)?;

    let matched = evaluate(pool, &criteria, now).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM scanner_results WHERE scanner_id = ?")
        .bind(scanner_id)
        .execute(&mut *tx)
        .await?;
    for symbol in &matched {
        sqlx::query("INSERT INTO scanner_results (scanner_id, ticker, matched_at) VALUES (?, ?, ?)")
            .bind(scanner_id)
            .bind(symbol)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(
        scanner_id,
        name = %scanner.name,
        matched = matched.len(),
        "scanner run complete"
    );

    Ok(ScanOutcome {
        scanner_id,
        matched,
        matched_at: now,
    })
}

/// Compute the match set in memory: one grouped query per present criterion,
/// then intersect via the criteria predicates. Symbols come back sorted, so
/// identical data yields an identical list.
async fn evaluate(
    pool: &SqlitePool,
    criteria: &ScannerCriteria,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let mut symbols: Vec<String> =
        sqlx::query_scalar("SELECT symbol FROM tickers ORDER BY symbol")
            .fetch_all(pool)
            .await?;

    if criteria.is_empty() {
        return Ok(symbols);
    }

    let avg_amounts: HashMap<String, f64> = if criteria.dividend_yield.is_some() {
        sqlx::query_as::<_, (String, f64)>(
            "SELECT ticker, AVG(amount) FROM dividend_records GROUP BY ticker",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect()
    } else {
        HashMap::new()
    };

    let buy_counts: HashMap<String, i64> = match criteria.insider_buys_last_days {
        Some(days) => {
            let since = now - Duration::days(days);
            sqlx::query_as::<_, (String, i64)>(
                "SELECT ticker, COUNT(*) FROM form4_records \
                 WHERE transaction_type = 'Buy' AND filed_at >= ? GROUP BY ticker",
            )
            .bind(since)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
        }
        None => HashMap::new(),
    };

    symbols.retain(|symbol| {
        let facts = TickerFacts {
            avg_dividend_amount: avg_amounts.get(symbol).copied(),
            buy_filings_in_window: buy_counts.get(symbol).copied().unwrap_or(0),
        };
        criteria.matches(&facts)
    });

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;
    use chrono::{NaiveDate, TimeZone};

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    async fn add_ticker(pool: &SqlitePool, symbol: &str) {
        sqlx::query("INSERT INTO tickers (symbol, name) VALUES (?, ?)")
            .bind(symbol)
            .bind(symbol)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn add_dividend(pool: &SqlitePool, symbol: &str, amount: f64, ex_date: NaiveDate) {
        sqlx::query("INSERT INTO dividend_records (ticker, amount, ex_date) VALUES (?, ?, ?)")
            .bind(symbol)
            .bind(amount)
            .bind(ex_date)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn add_filing(pool: &SqlitePool, symbol: &str, kind: &str, filed_at: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO form4_records (ticker, filer_name, transaction_type, filed_at) \
             VALUES (?, 'Test Filer', ?, ?)",
        )
        .bind(symbol)
        .bind(kind)
        .bind(filed_at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn add_scanner(pool: &SqlitePool, criteria: &str) -> i64 {
        sqlx::query(
            "INSERT INTO scanners (user_id, name, criteria, created_at, updated_at) \
             VALUES (1, 'test', ?, ?, ?)",
        )
        .bind(criteria)
        .bind(run_time())
        .bind(run_time())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    async fn result_symbols(pool: &SqlitePool, scanner_id: i64) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT ticker FROM scanner_results WHERE scanner_id = ? ORDER BY ticker",
        )
        .bind(scanner_id)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn missing_scanner_is_not_found() {
        let pool = test_pool().await;
        let err = run_scanner(&pool, 42, run_time()).await.unwrap_err();
        assert!(matches!(err, AppError::ScannerNotFound(42)));
    }

    #[tokio::test]
    async fn empty_criteria_matches_all_tickers() {
        let pool = test_pool().await;
        for s in ["AAA", "BBB", "CCC"] {
            add_ticker(&pool, s).await;
        }
        let id = add_scanner(&pool, "{}").await;

        let outcome = run_scanner(&pool, id, run_time()).await.unwrap();
        assert_eq!(outcome.matched, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(result_symbols(&pool, id).await, vec!["AAA", "BBB", "CCC"]);
    }

    #[tokio::test]
    async fn dividend_yield_uses_all_time_average() {
        let pool = test_pool().await;
        add_ticker(&pool, "HIGH").await;
        add_ticker(&pool, "LOW").await;
        add_ticker(&pool, "NONE").await;
        // HIGH averages 0.75, LOW averages 0.25, NONE has no history.
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(); // old records still count
        add_dividend(&pool, "HIGH", 1.0, d1).await;
        add_dividend(&pool, "HIGH", 0.5, d2).await;
        add_dividend(&pool, "LOW", 0.25, d1).await;

        let id = add_scanner(&pool, r#"{"dividendYield":{"operator":">=","value":0.5}}"#).await;
        let outcome = run_scanner(&pool, id, run_time()).await.unwrap();
        assert_eq!(outcome.matched, vec!["HIGH"]);
    }

    #[tokio::test]
    async fn insider_criterion_only_counts_recent_buys() {
        let pool = test_pool().await;
        add_ticker(&pool, "FRESH").await;
        add_ticker(&pool, "STALE").await;
        add_ticker(&pool, "SELLER").await;
        let now = run_time();
        add_filing(&pool, "FRESH", "Buy", now - Duration::days(3)).await;
        add_filing(&pool, "STALE", "Buy", now - Duration::days(10)).await;
        add_filing(&pool, "SELLER", "Sell", now - Duration::days(1)).await;

        let id = add_scanner(&pool, r#"{"insiderBuysLastDays":7}"#).await;
        let outcome = run_scanner(&pool, id, now).await.unwrap();
        assert_eq!(outcome.matched, vec!["FRESH"]);
    }

    #[tokio::test]
    async fn combined_criteria_use_and_semantics() {
        let pool = test_pool().await;
        add_ticker(&pool, "BOTH").await;
        add_ticker(&pool, "DIV_ONLY").await;
        add_ticker(&pool, "BUY_ONLY").await;
        let now = run_time();
        let ex = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        add_dividend(&pool, "BOTH", 1.0, ex).await;
        add_dividend(&pool, "DIV_ONLY", 1.0, ex).await;
        add_filing(&pool, "BOTH", "Buy", now - Duration::days(2)).await;
        add_filing(&pool, "BUY_ONLY", "Buy", now - Duration::days(2)).await;

        let id = add_scanner(
            &pool,
            r#"{"dividendYield":{"operator":">","value":0.5},"insiderBuysLastDays":7}"#,
        )
        .await;
        let outcome = run_scanner(&pool, id, now).await.unwrap();
        assert_eq!(outcome.matched, vec!["BOTH"]);
    }

    #[tokio::test]
    async fn rerun_with_unchanged_data_is_idempotent() {
        let pool = test_pool().await;
        add_ticker(&pool, "AAA").await;
        add_ticker(&pool, "BBB").await;
        add_dividend(&pool, "AAA", 1.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).await;
        let id = add_scanner(&pool, r#"{"dividendYield":{"operator":">","value":0.0}}"#).await;

        let first = run_scanner(&pool, id, run_time()).await.unwrap();
        let second = run_scanner(&pool, id, run_time()).await.unwrap();
        assert_eq!(first.matched, second.matched);
        assert_eq!(result_symbols(&pool, id).await, vec!["AAA"]);
    }

    #[tokio::test]
    async fn rerun_replaces_rather_than_merges() {
        let pool = test_pool().await;
        for s in ["A", "B", "C"] {
            add_ticker(&pool, s).await;
        }
        let now = run_time();
        // First run matches {A, B}.
        add_filing(&pool, "A", "Buy", now - Duration::days(6)).await;
        add_filing(&pool, "B", "Buy", now - Duration::days(1)).await;
        let id = add_scanner(&pool, r#"{"insiderBuysLastDays":7}"#).await;
        run_scanner(&pool, id, now).await.unwrap();
        assert_eq!(result_symbols(&pool, id).await, vec!["A", "B"]);

        // A's filing ages out of the window; C gets a fresh one. The rerun
        // must leave exactly {B, C} — no stale A row.
        let later = now + Duration::days(3);
        add_filing(&pool, "C", "Buy", later - Duration::days(1)).await;
        run_scanner(&pool, id, later).await.unwrap();
        assert_eq!(result_symbols(&pool, id).await, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn invalid_criteria_leaves_previous_results_intact() {
        let pool = test_pool().await;
        add_ticker(&pool, "AAA").await;
        let id = add_scanner(&pool, "{}").await;
        run_scanner(&pool, id, run_time()).await.unwrap();
        assert_eq!(result_symbols(&pool, id).await, vec!["AAA"]);

        sqlx::query("UPDATE scanners SET criteria = ? WHERE id = ?")
            .bind(r#"{"insiderBuysLastDays":"soon"}"#)
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let err = run_scanner(&pool, id, run_time()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCriteria(_)));
        assert_eq!(result_symbols(&pool, id).await, vec!["AAA"]);
    }
}
