use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use enx_gateway::{AppState, GatewaySettings, Stores, build_router, rate_limit, seed_admin};
use enx_platform::{
    PaystackGateway, PgInvoiceStore, PgItemStore, PgShipmentStore, PgUserStore, ServiceConfig,
    WhatsAppCloudMessenger, connect_database, ensure_schema,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "enx_gateway=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:5000")?;
    let pool = connect_database(&config.database_url).await?;
    ensure_schema(&pool).await?;

    let stores = Stores {
        users: Arc::new(PgUserStore::new(pool.clone())),
        shipments: Arc::new(PgShipmentStore::new(pool.clone())),
        invoices: Arc::new(PgInvoiceStore::new(pool.clone())),
        items: Arc::new(PgItemStore::new(pool)),
    };
    let messenger = Arc::new(WhatsAppCloudMessenger::new(config.whatsapp.clone())?);
    let payments = Arc::new(PaystackGateway::new(config.paystack.clone())?);
    if config.paystack.secret_key.is_none() {
        warn!("PAYSTACK_SECRET_KEY is not set; card payments will fail");
    }

    let settings = GatewaySettings::from_config(&config);
    tokio::fs::create_dir_all(&settings.uploads_dir)
        .await
        .with_context(|| format!("failed to create {}", settings.uploads_dir.display()))?;

    let state = AppState::new(stores, messenger, payments, settings)?;
    if let Some(seed) = &config.admin {
        if seed_admin(state.users.as_ref(), &state.passwords, seed).await? {
            info!(email = %seed.email, "admin account created");
        }
    }

    rate_limit::spawn_pruning(
        state.auth_limiter.clone(),
        config.auth.rate_limit_window,
    );

    let router = build_router(state);
    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
