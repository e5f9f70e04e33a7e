use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use enx_core::{Messenger, PaymentGateway};
use enx_platform::{AuthSettings, ServiceConfig};
use enx_store::{InvoiceStore, ItemStore, ShipmentStore, UserStore};

use crate::{
    auth::Passwords,
    rate_limit::{AuthRateLimiter, build_auth_limiter},
};

/// Proof-of-transfer uploads larger than this are refused.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub auth: AuthSettings,
    pub frontend_url: String,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl GatewaySettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            auth: config.auth.clone(),
            frontend_url: config.frontend_url.clone(),
            uploads_dir: PathBuf::from(&config.uploads_dir),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub shipments: Arc<dyn ShipmentStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub items: Arc<dyn ItemStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub shipments: Arc<dyn ShipmentStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub items: Arc<dyn ItemStore>,
    pub messenger: Arc<dyn Messenger>,
    pub payments: Arc<dyn PaymentGateway>,
    pub settings: Arc<GatewaySettings>,
    pub passwords: Passwords,
    pub auth_limiter: Arc<AuthRateLimiter>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        messenger: Arc<dyn Messenger>,
        payments: Arc<dyn PaymentGateway>,
        settings: GatewaySettings,
    ) -> Result<Self> {
        let auth_limiter = Arc::new(build_auth_limiter(&settings.auth)?);
        Ok(Self {
            users: stores.users,
            shipments: stores.shipments,
            invoices: stores.invoices,
            items: stores.items,
            messenger,
            payments,
            settings: Arc::new(settings),
            passwords: Passwords::default(),
            auth_limiter,
        })
    }

    pub fn with_passwords(mut self, passwords: Passwords) -> Self {
        self.passwords = passwords;
        self
    }
}
