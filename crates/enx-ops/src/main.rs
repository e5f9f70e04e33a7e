use anyhow::Result;
use chrono::Utc;
use enx_platform::{PgInvoiceStore, WorkerConfig, connect_database, ensure_schema};
use enx_store::InvoiceStore;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "enx_ops=info".to_string()),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    let pool = connect_database(&config.database_url).await?;
    ensure_schema(&pool).await?;
    let invoices = PgInvoiceStore::new(pool);

    let mut ticker = interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval_secs = config.sweep_interval.as_secs(),
        "overdue invoice sweep scheduled"
    );

    loop {
        ticker.tick().await;
        if let Err(err) = sweep(&invoices).await {
            error!("overdue sweep failed: {err:#}");
        }
    }
}

async fn sweep(invoices: &dyn InvoiceStore) -> Result<()> {
    let changed = invoices.mark_overdue(Utc::now()).await?;
    if changed > 0 {
        info!(changed, "invoices marked overdue");
    }
    Ok(())
}
