pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod scanner;
pub mod scheduler;
