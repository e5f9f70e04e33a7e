use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enx_billing::{Invoice, InvoiceStatus, StatusSummary};
use enx_core::{Page, Role, User};
use enx_logistics::{
    CategoryStats, Item, ItemCategory, Shipment, ShipmentPaymentStatus, ShipmentStatus,
};
use enx_store::{InvoiceStore, ItemStore, ShipmentStore, UserStore};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

fn page_bounds(page: Page) -> (i64, i64) {
    let offset = i64::try_from(page.skip()).unwrap_or(i64::MAX);
    (i64::from(page.limit), offset)
}

fn count_from(row: &PgRow) -> Result<u64> {
    let count: i64 = row.try_get("count")?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::parse(&role).with_context(|| format!("unknown role {role}"))?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn doc_from_row<T: serde::de::DeserializeOwned>(row: &PgRow) -> Result<T> {
    let Json(doc): Json<T> = row.try_get("doc")?;
    Ok(doc)
}

fn docs_from_rows<T: serde::de::DeserializeOwned>(rows: &[PgRow]) -> Result<Vec<T>> {
    rows.iter().map(doc_from_row).collect()
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, role, \
                            is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id,
                first_name,
                last_name,
                email,
                phone,
                password_hash,
                role,
                is_active,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                phone = $4,
                password_hash = $5,
                role = $6,
                is_active = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct PgShipmentStore {
    pool: PgPool,
}

impl PgShipmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShipmentStore for PgShipmentStore {
    async fn insert(&self, shipment: &Shipment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shipments (
                id,
                tracking_number,
                status,
                created_by,
                sender_email,
                recipient_email,
                created_at,
                updated_at,
                doc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(shipment.id)
        .bind(&shipment.tracking_number)
        .bind(shipment.status.as_str())
        .bind(shipment.created_by)
        .bind(&shipment.sender_email)
        .bind(&shipment.recipient_email)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .bind(Json(shipment))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert shipment {}", shipment.tracking_number))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shipment>> {
        let row = sqlx::query("SELECT doc FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(doc_from_row).transpose()
    }

    async fn find_by_tracking_number(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let row = sqlx::query("SELECT doc FROM shipments WHERE tracking_number = $1")
            .bind(tracking_number)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(doc_from_row).transpose()
    }

    async fn save(&self, shipment: &Shipment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE shipments
            SET status = $2,
                sender_email = $3,
                recipient_email = $4,
                updated_at = $5,
                doc = $6
            WHERE id = $1
            "#,
        )
        .bind(shipment.id)
        .bind(shipment.status.as_str())
        .bind(&shipment.sender_email)
        .bind(&shipment.recipient_email)
        .bind(shipment.updated_at)
        .bind(Json(shipment))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, status: Option<ShipmentStatus>, page: Page) -> Result<(Vec<Shipment>, u64)> {
        let status = status.map(ShipmentStatus::as_str);
        let (limit, offset) = page_bounds(page);

        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM shipments
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query(
            "SELECT COUNT(*) AS count FROM shipments WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((docs_from_rows(&rows)?, count_from(&total)?))
    }

    async fn list_for_user(&self, user_id: Uuid, email: &str) -> Result<Vec<Shipment>> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM shipments
            WHERE created_by = $1
               OR lower(sender_email) = lower($2)
               OR lower(recipient_email) = lower($2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        docs_from_rows(&rows)
    }

    async fn set_invoice(&self, id: Uuid, invoice_id: Option<Uuid>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET updated_at = $3,
                doc = jsonb_set(
                    jsonb_set(doc, '{invoiceId}', $2),
                    '{updatedAt}',
                    to_jsonb($3::timestamptz)
                )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(invoice_id))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_payment_status(&self, id: Uuid, status: ShipmentPaymentStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET updated_at = $3,
                doc = jsonb_set(
                    jsonb_set(doc, '{paymentStatus}', $2),
                    '{updatedAt}',
                    to_jsonb($3::timestamptz)
                )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(status))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<Vec<(ShipmentStatus, u64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM shipments GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let status: String = row.try_get("status")?;
            let status = ShipmentStatus::parse(&status)
                .with_context(|| format!("unknown shipment status {status}"))?;
            counts.push((status, count_from(row)?));
        }
        counts.sort_by_key(|(status, _)| ShipmentStatus::ALL.iter().position(|s| s == status));
        Ok(counts)
    }
}

#[derive(Clone)]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert_invoice<'e>(executor: impl PgExecutor<'e>, invoice: &Invoice) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id,
            invoice_number,
            customer_id,
            status,
            total,
            due_date,
            shipment_id,
            created_at,
            updated_at,
            doc
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id)
        DO UPDATE SET
            customer_id = EXCLUDED.customer_id,
            status = EXCLUDED.status,
            total = EXCLUDED.total,
            due_date = EXCLUDED.due_date,
            shipment_id = EXCLUDED.shipment_id,
            updated_at = EXCLUDED.updated_at,
            doc = EXCLUDED.doc
        "#,
    )
    .bind(invoice.id)
    .bind(&invoice.invoice_number)
    .bind(invoice.customer_id)
    .bind(invoice.status.as_str())
    .bind(invoice.total)
    .bind(invoice.due_date)
    .bind(invoice.shipment_id)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(Json(invoice))
    .execute(executor)
    .await
    .with_context(|| format!("failed to store invoice {}", invoice.invoice_number))?;

    Ok(())
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        upsert_invoice(&self.pool, invoice).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query("SELECT doc FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(doc_from_row).transpose()
    }

    async fn save(&self, invoice: &Invoice) -> Result<()> {
        upsert_invoice(&self.pool, invoice).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, status: Option<InvoiceStatus>, page: Page) -> Result<(Vec<Invoice>, u64)> {
        let status = status.map(InvoiceStatus::as_str);
        let (limit, offset) = page_bounds(page);

        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM invoices
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query(
            "SELECT COUNT(*) AS count FROM invoices WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((docs_from_rows(&rows)?, count_from(&total)?))
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>> {
        let rows = sqlx::query(
            "SELECT doc FROM invoices WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        docs_from_rows(&rows)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM invoices
            WHERE status = 'pending' AND due_date < $1
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        let mut changed = 0;
        for row in &rows {
            let mut invoice: Invoice = doc_from_row(row)?;
            if invoice.refresh_overdue(now) {
                upsert_invoice(&mut *tx, &invoice).await?;
                changed += 1;
            }
        }
        tx.commit().await?;

        Ok(changed)
    }

    async fn summary_by_status(&self) -> Result<Vec<(InvoiceStatus, StatusSummary)>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total), 0) AS total_amount
            FROM invoices
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summary = Vec::with_capacity(rows.len());
        for row in &rows {
            let status: String = row.try_get("status")?;
            let status = InvoiceStatus::parse(&status)
                .with_context(|| format!("unknown invoice status {status}"))?;
            let total_amount: Decimal = row.try_get("total_amount")?;
            summary.push((
                status,
                StatusSummary {
                    count: count_from(row)?,
                    total_amount,
                },
            ));
        }
        summary.sort_by_key(|(status, _)| InvoiceStatus::ALL.iter().position(|s| s == status));
        Ok(summary)
    }
}

#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn insert(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, shipment_id, category, weight, value, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id)
        .bind(item.shipment_id)
        .bind(item.category.as_str())
        .bind(item.weight)
        .bind(item.value)
        .bind(item.created_at)
        .bind(Json(item))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_shipment(&self, shipment_id: Uuid) -> Result<Vec<Item>> {
        let rows =
            sqlx::query("SELECT doc FROM items WHERE shipment_id = $1 ORDER BY created_at ASC")
                .bind(shipment_id)
                .fetch_all(&self.pool)
                .await?;

        docs_from_rows(&rows)
    }

    async fn stats_by_category(&self) -> Result<Vec<CategoryStats>> {
        let rows = sqlx::query(
            r#"
            SELECT category,
                   COUNT(*) AS count,
                   COALESCE(SUM(value), 0) AS total_value,
                   COALESCE(AVG(weight), 0) AS average_weight
            FROM items
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let category: String = row.try_get("category")?;
                Ok(CategoryStats {
                    category: ItemCategory::parse(&category)
                        .with_context(|| format!("unknown item category {category}"))?,
                    count: count_from(row)?,
                    total_value: row.try_get("total_value")?,
                    average_weight: row.try_get("average_weight")?,
                })
            })
            .collect()
    }
}
