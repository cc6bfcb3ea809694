use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dividash::alerts::notify::{LogNotifier, Notifier, WebhookNotifier};
use dividash::api::health::HealthState;
use dividash::api::routes::{router, ApiState};
use dividash::config::Config;
use dividash::db;
use dividash::error::Result;
use dividash::scheduler::JobScheduler;

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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    let notifier: Arc<dyn Notifier> = match &cfg.alert_webhook_url {
        Some(url) => {
            info!("Alert notifications → webhook {url}");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("ALERT_WEBHOOK_URL not set — alert notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let health = Arc::new(HealthState::new());

    JobScheduler::new(pool.clone(), notifier, Arc::clone(&health)).spawn();
    info!("Job loops started (metrics daily, scans hourly, alerts every 5m)");

    let app = router(ApiState {
        pool,
        health,
    });
    let addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
