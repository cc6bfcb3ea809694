use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::alerts::condition::AlertCondition;
use crate::api::health::HealthState;
use crate::db::models::{Alert, Scanner};
use crate::error::{AppError, Result};
use crate::scanner::canned::{self, CannedMatch};
use crate::scanner::criteria::ScannerCriteria;
use crate::scanner::engine;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/scanners", get(list_scanners).post(create_scanner))
        .route("/scanners/high-dividend", get(get_high_dividend))
        .route("/scanners/insider-activity", get(get_insider_activity))
        .route("/scanners/:id", axum::routing::delete(delete_scanner))
        .route("/scanners/:id/run", post(run_scanner))
        .route("/scanners/:id/results", get(get_scanner_results))
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/:id", axum::routing::put(update_alert).delete(delete_alert))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct CreateScannerRequest {
    pub user_id: i64,
    pub name: String,
    pub criteria: Value,
}

#[derive(Serialize)]
pub struct ScannerResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub criteria: Value,
    pub created_at: DateTime<Utc>,
}

impl From<Scanner> for ScannerResponse {
    fn from(s: Scanner) -> Self {
        let criteria = serde_json::from_str(&s.criteria).unwrap_or(Value::Null);
        Self {
            id: s.id,
            user_id: s.user_id,
            name: s.name,
            criteria,
            created_at: s.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct RunResponse {
    pub scanner_id: i64,
    pub count: usize,
    pub symbols: Vec<String>,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct ResultRow {
    pub ticker: String,
    pub matched_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub scanner: ScannerResponse,
    pub results: Vec<ResultRow>,
}

#[derive(Deserialize)]
pub struct CreateAlertRequest {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateAlertRequest {
    pub symbol: Option<String>,
    pub config: Option<Value>,
    pub active: Option<bool>,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: Option<String>,
    pub config: Value,
    pub active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(a: Alert) -> Self {
        let config = serde_json::from_str(&a.config).unwrap_or(Value::Null);
        Self {
            id: a.id,
            user_id: a.user_id,
            kind: a.kind,
            symbol: a.symbol,
            config,
            active: a.active,
            last_triggered_at: a.last_triggered_at,
            created_at: a.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "last_metrics_run": state.health.last_metrics_run(),
        "last_scanner_run": state.health.last_scanner_run(),
        "last_alert_run": state.health.last_alert_run(),
    }))
}

async fn list_scanners(
    State(state): State<ApiState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<ScannerResponse>>> {
    let rows = sqlx::query_as::<_, Scanner>(
        "SELECT id, user_id, name, criteria, created_at, updated_at FROM scanners \
         WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows.into_iter().map(ScannerResponse::from).collect()))
}

async fn create_scanner(
    State(state): State<ApiState>,
    Json(req): Json<CreateScannerRequest>,
) -> Result<(StatusCode, Json<ScannerResponse>)> {
    // Reject malformed documents at the boundary; the engines never
    // re-validate defensively.
    ScannerCriteria::parse(&req.criteria)?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO scanners (user_id, name, criteria, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(req.user_id)
    .bind(&req.name)
    .bind(req.criteria.to_string())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?
    .last_insert_rowid();

    let scanner = engine::fetch_scanner(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(scanner.into())))
}

async fn delete_scanner(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    engine::fetch_scanner(&state.pool, id).await?;

    // Results go with the scanner; done explicitly since SQLite ships with
    // foreign-key enforcement off.
    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM scanner_results WHERE scanner_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM scanners WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_scanner(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<RunResponse>> {
    let outcome = engine::run_scanner(&state.pool, id, Utc::now()).await?;
    Ok(Json(RunResponse {
        scanner_id: outcome.scanner_id,
        count: outcome.matched.len(),
        symbols: outcome.matched,
    }))
}

async fn get_scanner_results(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ResultsResponse>> {
    let scanner = engine::fetch_scanner(&state.pool, id).await?;
    let results = sqlx::query_as::<_, ResultRow>(
        "SELECT ticker, matched_at FROM scanner_results \
         WHERE scanner_id = ? ORDER BY matched_at DESC, ticker",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(ResultsResponse {
        scanner: scanner.into(),
        results,
    }))
}

async fn get_high_dividend(State(state): State<ApiState>) -> Result<Json<Vec<CannedMatch>>> {
    Ok(Json(canned::high_dividend(&state.pool).await?))
}

async fn get_insider_activity(State(state): State<ApiState>) -> Result<Json<Vec<CannedMatch>>> {
    Ok(Json(canned::insider_activity(&state.pool).await?))
}

async fn list_alerts(
    State(state): State<ApiState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<AlertResponse>>> {
    let rows = sqlx::query_as::<_, Alert>(
        "SELECT id, user_id, type, symbol, config, active, last_triggered_at, created_at \
         FROM alerts WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows.into_iter().map(AlertResponse::from).collect()))
}

async fn create_alert(
    State(state): State<ApiState>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<AlertResponse>)> {
    let config = req.config.unwrap_or_else(|| Value::Object(Default::default()));
    let config_raw = config.to_string();
    AlertCondition::parse(&req.kind, &config_raw)?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO alerts (user_id, type, symbol, config, active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(req.user_id)
    .bind(&req.kind)
    .bind(&req.symbol)
    .bind(config_raw)
    .bind(req.active.unwrap_or(true))
    .bind(now)
    .execute(&state.pool)
    .await?
    .last_insert_rowid();

    let alert = fetch_alert(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(alert.into())))
}

async fn update_alert(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<AlertResponse>> {
    let alert = fetch_alert(&state.pool, id).await?;

    let symbol = req.symbol.or(alert.symbol);
    let config_raw = match req.config {
        Some(config) => {
            let raw = config.to_string();
            AlertCondition::parse(&alert.kind, &raw)?;
            raw
        }
        None => alert.config,
    };
    let active = req.active.unwrap_or(alert.active);

    sqlx::query("UPDATE alerts SET symbol = ?, config = ?, active = ? WHERE id = ?")
        .bind(&symbol)
        .bind(&config_raw)
        .bind(active)
        .bind(id)
        .execute(&state.pool)
        .await?;

    let alert = fetch_alert(&state.pool, id).await?;
    Ok(Json(alert.into()))
}

async fn delete_alert(State(state): State<ApiState>, Path(id): Path<i64>) -> Result<StatusCode> {
    fetch_alert(&state.pool, id).await?;
    sqlx::query("DELETE FROM alerts WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_alert(pool: &SqlitePool, id: i64) -> Result<Alert> {
    sqlx::query_as::<_, Alert>(
        "SELECT id, user_id, type, symbol, config, active, last_triggered_at, created_at \
         FROM alerts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::AlertNotFound(id))
}
