pub mod config;
pub mod contracts;
pub mod db;
pub mod paystack;
pub mod postgres;
pub mod whatsapp;

pub use config::{
    AdminSeed, AuthSettings, PaystackSettings, ServiceConfig, WhatsAppSettings, WorkerConfig,
};
pub use db::{connect_database, ensure_schema};
pub use paystack::PaystackGateway;
pub use postgres::{PgInvoiceStore, PgItemStore, PgShipmentStore, PgUserStore};
pub use whatsapp::WhatsAppCloudMessenger;
