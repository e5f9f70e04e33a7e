use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enx_billing::{Invoice, InvoiceStatus, StatusSummary};
use enx_core::{Page, User};
use enx_logistics::{
    CategoryStats, Item, Shipment, ShipmentPaymentStatus, ShipmentStatus, summarize_by_category,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::storage::{InvoiceStore, ItemStore, ShipmentStore, UserStore};

fn paginate<T>(items: Vec<T>, page: Page) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
    let rows = items.into_iter().skip(skip).take(page.limit as usize).collect();
    (rows, total)
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &User) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Ok(false);
        }
        users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryShipmentStore {
    shipments: RwLock<HashMap<Uuid, Shipment>>,
}

impl InMemoryShipmentStore {
    async fn newest_first(&self, keep: impl Fn(&Shipment) -> bool) -> Vec<Shipment> {
        let shipments = self.shipments.read().await;
        let mut rows: Vec<Shipment> = shipments.values().filter(|s| keep(s)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn insert(&self, shipment: &Shipment) -> anyhow::Result<()> {
        let mut shipments = self.shipments.write().await;
        if shipments
            .values()
            .any(|existing| existing.tracking_number == shipment.tracking_number)
        {
            anyhow::bail!("tracking number {} already stored", shipment.tracking_number);
        }
        shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Shipment>> {
        Ok(self.shipments.read().await.get(&id).cloned())
    }

    async fn find_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> anyhow::Result<Option<Shipment>> {
        let shipments = self.shipments.read().await;
        Ok(shipments
            .values()
            .find(|shipment| shipment.tracking_number == tracking_number)
            .cloned())
    }

    async fn save(&self, shipment: &Shipment) -> anyhow::Result<()> {
        self.shipments
            .write()
            .await
            .insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn list(
        &self,
        status: Option<ShipmentStatus>,
        page: Page,
    ) -> anyhow::Result<(Vec<Shipment>, u64)> {
        let rows = self
            .newest_first(|shipment| status.is_none_or(|wanted| shipment.status == wanted))
            .await;
        Ok(paginate(rows, page))
    }

    async fn list_for_user(&self, user_id: Uuid, email: &str) -> anyhow::Result<Vec<Shipment>> {
        Ok(self
            .newest_first(|shipment| {
                shipment.created_by == user_id || shipment.involves_email(email)
            })
            .await)
    }

    async fn set_invoice(&self, id: Uuid, invoice_id: Option<Uuid>) -> anyhow::Result<bool> {
        let mut shipments = self.shipments.write().await;
        Ok(match shipments.get_mut(&id) {
            Some(shipment) => {
                shipment.invoice_id = invoice_id;
                shipment.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: ShipmentPaymentStatus,
    ) -> anyhow::Result<bool> {
        let mut shipments = self.shipments.write().await;
        Ok(match shipments.get_mut(&id) {
            Some(shipment) => {
                shipment.payment_status = status;
                shipment.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn count_by_status(&self) -> anyhow::Result<Vec<(ShipmentStatus, u64)>> {
        let shipments = self.shipments.read().await;
        Ok(ShipmentStatus::ALL
            .into_iter()
            .map(|status| {
                let count = shipments.values().filter(|s| s.status == status).count();
                (status, count as u64)
            })
            .filter(|(_, count)| *count > 0)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<Uuid, Invoice>>,
}

impl InMemoryInvoiceStore {
    async fn newest_first(&self, keep: impl Fn(&Invoice) -> bool) -> Vec<Invoice> {
        let invoices = self.invoices.read().await;
        let mut rows: Vec<Invoice> = invoices.values().filter(|i| keep(i)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> anyhow::Result<()> {
        let mut invoices = self.invoices.write().await;
        if invoices
            .values()
            .any(|existing| existing.invoice_number == invoice.invoice_number)
        {
            anyhow::bail!("invoice number {} already stored", invoice.invoice_number);
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Invoice>> {
        Ok(self.invoices.read().await.get(&id).cloned())
    }

    async fn save(&self, invoice: &Invoice) -> anyhow::Result<()> {
        self.invoices
            .write()
            .await
            .insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.invoices.write().await.remove(&id).is_some())
    }

    async fn list(
        &self,
        status: Option<InvoiceStatus>,
        page: Page,
    ) -> anyhow::Result<(Vec<Invoice>, u64)> {
        let rows = self
            .newest_first(|invoice| status.is_none_or(|wanted| invoice.status == wanted))
            .await;
        Ok(paginate(rows, page))
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> anyhow::Result<Vec<Invoice>> {
        Ok(self
            .newest_first(|invoice| invoice.customer_id == customer_id)
            .await)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut invoices = self.invoices.write().await;
        let changed = invoices
            .values_mut()
            .map(|invoice| invoice.refresh_overdue(now))
            .filter(|changed| *changed)
            .count();
        Ok(changed as u64)
    }

    async fn summary_by_status(&self) -> anyhow::Result<Vec<(InvoiceStatus, StatusSummary)>> {
        let invoices = self.invoices.read().await;
        Ok(InvoiceStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let mut summary = StatusSummary::default();
                for invoice in invoices.values().filter(|i| i.status == status) {
                    summary.count += 1;
                    summary.total_amount += invoice.total;
                }
                (summary.count > 0).then_some((status, summary))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryItemStore {
    items: RwLock<HashMap<Uuid, Item>>,
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn insert(&self, item: &Item) -> anyhow::Result<()> {
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn list_for_shipment(&self, shipment_id: Uuid) -> anyhow::Result<Vec<Item>> {
        let items = self.items.read().await;
        let mut rows: Vec<Item> = items
            .values()
            .filter(|item| item.shipment_id == shipment_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn stats_by_category(&self) -> anyhow::Result<Vec<CategoryStats>> {
        let items = self.items.read().await;
        Ok(summarize_by_category(items.values()))
    }
}
