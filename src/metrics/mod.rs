//! Ticker metrics aggregator: sole writer of the derived
//! `avg_dividend_yield` and `insider_buys_90d` columns.

pub mod aggregator;

pub use aggregator::compute_ticker_metrics;
