//! SQLite pool bootstrap and row models.

pub mod models;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

use crate::error::Result;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open (creating if missing) the database at `path` and apply migrations.
pub async fn connect(path: &str) -> Result<SqlitePool> {
    let pool = SqlitePool::connect(&format!("sqlite:{path}?mode=rwc")).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
