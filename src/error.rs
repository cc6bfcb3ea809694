use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scanner {0} not found")]
    ScannerNotFound(i64),

    #[error("alert {0} not found")]
    AlertNotFound(i64),

    #[error("invalid scanner criteria: {0}")]
    InvalidCriteria(String),

    #[error("invalid alert config: {0}")]
    InvalidConfig(String),

    #[error("notification dispatch failed: {0}")]
    NotificationDispatch(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::ScannerNotFound(_) | AppError::AlertNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCriteria(_) | AppError::InvalidConfig(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
