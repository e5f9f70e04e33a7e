use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enx_billing::{Invoice, InvoiceStatus, StatusSummary};
use enx_core::{Page, User};
use enx_logistics::{CategoryStats, Item, Shipment, ShipmentPaymentStatus, ShipmentStatus};
use uuid::Uuid;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns false when the email is already registered.
    async fn insert(&self, user: &User) -> anyhow::Result<bool>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
}

/// Shipment documents. Every write replaces the whole document; last write wins.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn insert(&self, shipment: &Shipment) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Shipment>>;
    async fn find_by_tracking_number(&self, tracking_number: &str)
    -> anyhow::Result<Option<Shipment>>;
    async fn save(&self, shipment: &Shipment) -> anyhow::Result<()>;
    /// Newest first, with the total number of matches.
    async fn list(
        &self,
        status: Option<ShipmentStatus>,
        page: Page,
    ) -> anyhow::Result<(Vec<Shipment>, u64)>;
    /// Shipments created by the user or naming their email as sender or recipient.
    async fn list_for_user(&self, user_id: Uuid, email: &str) -> anyhow::Result<Vec<Shipment>>;
    /// Returns false when the shipment does not exist.
    async fn set_invoice(&self, id: Uuid, invoice_id: Option<Uuid>) -> anyhow::Result<bool>;
    async fn set_payment_status(
        &self,
        id: Uuid,
        status: ShipmentPaymentStatus,
    ) -> anyhow::Result<bool>;
    async fn count_by_status(&self) -> anyhow::Result<Vec<(ShipmentStatus, u64)>>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Invoice>>;
    async fn save(&self, invoice: &Invoice) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn list(
        &self,
        status: Option<InvoiceStatus>,
        page: Page,
    ) -> anyhow::Result<(Vec<Invoice>, u64)>;
    /// Newest first.
    async fn list_for_customer(&self, customer_id: Uuid) -> anyhow::Result<Vec<Invoice>>;
    /// Escalates pending invoices due before `now`; returns how many changed.
    async fn mark_overdue(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
    async fn summary_by_status(&self) -> anyhow::Result<Vec<(InvoiceStatus, StatusSummary)>>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert(&self, item: &Item) -> anyhow::Result<()>;
    async fn list_for_shipment(&self, shipment_id: Uuid) -> anyhow::Result<Vec<Item>>;
    async fn stats_by_category(&self) -> anyhow::Result<Vec<CategoryStats>>;
}
