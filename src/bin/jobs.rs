//! One-shot job runner for operators and cron:
//!
//!   jobs metrics       recompute ticker aggregates
//!   jobs scan <id>     run one saved scanner
//!   jobs scan-all      run every saved scanner
//!   jobs alerts        evaluate all active alerts once

use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use dividash::alerts::{self, notify::{LogNotifier, Notifier, WebhookNotifier}};
use dividash::config::Config;
use dividash::db;
use dividash::error::Result;
use dividash::metrics;
use dividash::scanner;
use dividash::scheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(cfg, &args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, args: &[String]) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    let now = Utc::now();

    match args.first().map(String::as_str) {
        Some("metrics") => {
            let updated = metrics::compute_ticker_metrics(&pool, now).await?;
            println!("updated {updated} tickers");
        }
        Some("scan") => {
            let id: i64 = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| usage("scan requires a numeric scanner id"))?;
            let outcome = scanner::run_scanner(&pool, id, now).await?;
            println!(
                "scanner {id}: {} tickers matched: {}",
                outcome.matched.len(),
                outcome.matched.join(", ")
            );
        }
        Some("scan-all") => {
            let ran = scheduler::run_all_scanners(&pool).await?;
            println!("ran {ran} scanners");
        }
        Some("alerts") => {
            let notifier: Arc<dyn Notifier> = match &cfg.alert_webhook_url {
                Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
                None => Arc::new(LogNotifier),
            };
            let summary = alerts::process_alerts(&pool, notifier.as_ref(), now).await?;
            println!(
                "alerts: {} evaluated, {} triggered, {} skipped, {} failed",
                summary.evaluated, summary.triggered, summary.skipped, summary.failed
            );
        }
        _ => {
            return Err(usage("expected one of: metrics, scan <id>, scan-all, alerts"));
        }
    }

    Ok(())
}

fn usage(msg: &str) -> dividash::error::AppError {
    dividash::error::AppError::Config(msg.to_string())
}
