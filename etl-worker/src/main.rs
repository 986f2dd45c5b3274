use anyhow::Error;
use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use etl_worker::config::Config;
use etl_worker::job;
use etl_worker::loader::LoadOutcome;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env()?;
    let report = job::run(&config).await?;

    info!(
        population_rows = report.population_rows,
        aging_rows = report.aging_rows,
        collections = report.collections,
        unified_rows = report.unified_rows,
        "run complete"
    );
    match &report.outcome {
        LoadOutcome::Warehouse { table, rows } => {
            info!(table = %table, rows, "loaded into the warehouse");
        }
        LoadOutcome::Fallback { path, rows } => {
            info!(path = %path.display(), rows, "warehouse unavailable, wrote fallback file");
        }
    }

    Ok(())
}
