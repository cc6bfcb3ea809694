use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A saved scanner. `criteria` is the raw JSON document as stored; the
/// scanner engine is its only interpreter (see `scanner::criteria`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Scanner {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub criteria: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved alert. `config` is the raw JSON document as stored; parsed into a
/// typed condition by `alerts::condition`. `last_triggered_at` is the only
/// field the alert engine mutates.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: Option<String>,
    pub config: String,
    pub active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
