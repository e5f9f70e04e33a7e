use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Flat 10% tax applied to every invoice subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    #[error("Invoice is already paid")]
    AlreadyPaid,
    #[error("Cannot delete a paid invoice")]
    PaidInvoiceNotDeletable,
    #[error("Cannot modify a paid invoice")]
    PaidInvoiceLocked,
    #[error("At least one item is required")]
    NoItems,
    #[error("Item quantity must be at least 1")]
    InvalidQuantity,
    #[error("Item price must be positive")]
    NegativePrice,
    #[error("Invoice amount is out of range")]
    AmountOutOfRange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
    PendingVerification,
    PaymentRejected,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
        InvoiceStatus::PendingVerification,
        InvoiceStatus::PaymentRejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::PendingVerification => "pending_verification",
            InvoiceStatus::PaymentRejected => "payment_rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Bank,
    Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl NewInvoiceItem {
    fn priced(self) -> Result<InvoiceItem, BillingError> {
        if self.quantity == 0 {
            return Err(BillingError::InvalidQuantity);
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(BillingError::NegativePrice);
        }
        let total = self
            .price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(BillingError::AmountOutOfRange)?;
        Ok(InvoiceItem {
            total,
            description: self.description,
            quantity: self.quantity,
            price: self.price,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub items: Vec<InvoiceItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub transfer_proof: Option<String>,
    pub shipment_id: Option<Uuid>,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new invoice. Client-side totals never reach this type.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub items: Vec<NewInvoiceItem>,
    pub currency: Option<String>,
    pub due_date: DateTime<Utc>,
    pub shipment_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Partial edit; `None` leaves the field as it is.
#[derive(Debug, Clone, Default)]
pub struct InvoiceUpdate {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub items: Option<Vec<NewInvoiceItem>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Count and summed totals for one invoice status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl Invoice {
    pub fn create(
        input: NewInvoice,
        invoice_number: String,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let mut invoice = Self {
            id: Uuid::new_v4(),
            invoice_number,
            customer_id: input.customer_id,
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            customer_phone: input.customer_phone,
            customer_address: input.customer_address,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            currency: input.currency.unwrap_or_else(|| "USD".to_string()),
            due_date: input.due_date,
            issue_date: now,
            status: InvoiceStatus::Pending,
            payment_date: None,
            payment_method: None,
            payment_reference: None,
            transfer_proof: None,
            shipment_id: input.shipment_id,
            notes: input.notes,
            admin_notes: None,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        invoice.set_items(input.items)?;
        invoice.refresh_overdue(now);
        Ok(invoice)
    }

    /// Replaces the line items and recomputes subtotal, tax and total.
    pub fn set_items(&mut self, items: Vec<NewInvoiceItem>) -> Result<(), BillingError> {
        if items.is_empty() {
            return Err(BillingError::NoItems);
        }
        let items = items
            .into_iter()
            .map(NewInvoiceItem::priced)
            .collect::<Result<Vec<_>, _>>()?;
        let (subtotal, tax, total) = totals(&items)?;
        self.items = items;
        self.subtotal = subtotal;
        self.tax = tax;
        self.total = total;
        Ok(())
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && self.status != InvoiceStatus::Paid
    }

    /// Moves a pending invoice past its due date to overdue. Returns true on transition.
    pub fn refresh_overdue(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == InvoiceStatus::Pending && self.is_overdue(now) {
            self.status = InvoiceStatus::Overdue;
            self.updated_at = now;
            return true;
        }
        false
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id || self.created_by == user_id
    }

    pub fn ensure_deletable(&self) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Err(BillingError::PaidInvoiceNotDeletable);
        }
        Ok(())
    }

    pub fn ensure_payable(&self) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Err(BillingError::AlreadyPaid);
        }
        Ok(())
    }

    pub fn apply_update(
        &mut self,
        update: InvoiceUpdate,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Err(BillingError::PaidInvoiceLocked);
        }
        if let Some(items) = update.items {
            self.set_items(items)?;
        }
        if let Some(name) = update.customer_name {
            self.customer_name = name;
        }
        if let Some(email) = update.customer_email {
            self.customer_email = email;
        }
        if let Some(phone) = update.customer_phone {
            self.customer_phone = phone;
        }
        if let Some(address) = update.customer_address {
            self.customer_address = address;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        self.updated_by = Some(actor);
        self.updated_at = now;
        self.refresh_overdue(now);
        Ok(())
    }

    pub fn mark_paid(
        &mut self,
        method: PaymentMethod,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = InvoiceStatus::Paid;
        self.payment_date = Some(now);
        self.payment_method = Some(method);
        if reference.is_some() {
            self.payment_reference = reference;
        }
        self.updated_at = now;
    }

    /// Records an uploaded proof of transfer and parks the invoice for admin review.
    pub fn submit_transfer_proof(
        &mut self,
        proof_path: String,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        self.ensure_payable()?;
        self.transfer_proof = Some(proof_path);
        self.payment_method = Some(PaymentMethod::Bank);
        self.status = InvoiceStatus::PendingVerification;
        self.updated_at = now;
        Ok(())
    }

    pub fn review_transfer(
        &mut self,
        verified: bool,
        notes: Option<String>,
        reviewer: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        self.ensure_payable()?;
        if verified {
            self.mark_paid(PaymentMethod::Bank, None, now);
        } else {
            self.status = InvoiceStatus::PaymentRejected;
            self.updated_at = now;
        }
        self.admin_notes = notes;
        self.updated_by = Some(reviewer);
        Ok(())
    }

    /// Total in minor currency units (cents, kobo) for card gateways.
    pub fn amount_minor(&self) -> Result<i64, BillingError> {
        self.total
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(BillingError::AmountOutOfRange)?
            .round()
            .to_i64()
            .ok_or(BillingError::AmountOutOfRange)
    }
}

/// Subtotal, tax and total; fails instead of overflowing the decimal range.
fn totals(items: &[InvoiceItem]) -> Result<(Decimal, Decimal, Decimal), BillingError> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total))
        .ok_or(BillingError::AmountOutOfRange)?;
    let tax = subtotal
        .checked_mul(TAX_RATE)
        .ok_or(BillingError::AmountOutOfRange)?;
    let total = subtotal
        .checked_add(tax)
        .ok_or(BillingError::AmountOutOfRange)?;
    Ok((subtotal, tax, total))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn item(description: &str, quantity: u32, price: i64) -> NewInvoiceItem {
        NewInvoiceItem {
            description: description.into(),
            quantity,
            price: Decimal::from(price),
        }
    }

    fn new_invoice(due_in: Duration) -> NewInvoice {
        NewInvoice {
            customer_id: Uuid::new_v4(),
            customer_name: "Amaka Obi".into(),
            customer_email: "amaka@example.com".into(),
            customer_phone: "+2348030000000".into(),
            customer_address: "7 Allen Avenue, Ikeja".into(),
            items: vec![item("Freight", 2, 10), item("Handling", 1, 5)],
            currency: None,
            due_date: Utc::now() + due_in,
            shipment_id: None,
            notes: None,
        }
    }

    fn sample() -> Invoice {
        Invoice::create(
            new_invoice(Duration::days(14)),
            "INV20260101001".into(),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn totals_follow_items_with_flat_tax() {
        let invoice = sample();
        assert_eq!(invoice.subtotal, Decimal::from(25));
        assert_eq!(invoice.tax, Decimal::new(25, 1));
        assert_eq!(invoice.total, Decimal::new(275, 1));
        assert_eq!(invoice.items[0].total, Decimal::from(20));
        assert_eq!(invoice.currency, "USD");
    }

    #[test]
    fn changing_items_recomputes_totals() {
        let mut invoice = sample();
        invoice
            .apply_update(
                InvoiceUpdate {
                    items: Some(vec![NewInvoiceItem {
                        description: "Storage".into(),
                        quantity: 3,
                        price: Decimal::new(1999, 2),
                    }]),
                    ..InvoiceUpdate::default()
                },
                Uuid::new_v4(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(invoice.subtotal, Decimal::new(5997, 2));
        assert_eq!(invoice.tax, invoice.subtotal * TAX_RATE);
        assert_eq!(invoice.total, invoice.subtotal + invoice.tax);
    }

    #[test]
    fn rejects_bad_items() {
        let mut invoice = sample();
        assert_eq!(invoice.set_items(Vec::new()), Err(BillingError::NoItems));
        assert_eq!(
            invoice.set_items(vec![item("Freight", 0, 10)]),
            Err(BillingError::InvalidQuantity)
        );
        assert_eq!(
            invoice.set_items(vec![item("Refund", 1, -1)]),
            Err(BillingError::NegativePrice)
        );
    }

    #[test]
    fn amounts_beyond_decimal_range_are_refused() {
        let mut invoice = sample();
        let before = invoice.total;
        let huge = |quantity| NewInvoiceItem {
            description: "Bullion".into(),
            quantity,
            price: Decimal::MAX,
        };

        assert_eq!(
            invoice.set_items(vec![huge(100)]),
            Err(BillingError::AmountOutOfRange)
        );
        assert_eq!(
            invoice.set_items(vec![huge(1), huge(1)]),
            Err(BillingError::AmountOutOfRange)
        );
        // subtotal fits, subtotal plus tax does not
        assert_eq!(
            invoice.set_items(vec![huge(1)]),
            Err(BillingError::AmountOutOfRange)
        );
        assert_eq!(invoice.total, before);
        assert_eq!(invoice.items.len(), 2);
    }

    #[test]
    fn pending_past_due_escalates_to_overdue() {
        let invoice = Invoice::create(
            new_invoice(Duration::days(-1)),
            "INV20260101002".into(),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
    }

    #[test]
    fn paid_invoice_is_never_overdue() {
        let mut invoice = sample();
        invoice.mark_paid(PaymentMethod::Card, Some("ENX1".into()), Utc::now());
        let later = Utc::now() + Duration::days(30);
        assert!(!invoice.is_overdue(later));
        assert!(!invoice.refresh_overdue(later));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn only_pending_escalates() {
        let mut invoice = sample();
        invoice
            .submit_transfer_proof("uploads/1.png".into(), Utc::now())
            .unwrap();
        assert!(!invoice.refresh_overdue(Utc::now() + Duration::days(30)));
        assert_eq!(invoice.status, InvoiceStatus::PendingVerification);
    }

    #[test]
    fn paid_invoices_cannot_be_deleted_or_edited() {
        let mut invoice = sample();
        assert!(invoice.ensure_deletable().is_ok());
        invoice.mark_paid(PaymentMethod::Cash, None, Utc::now());
        assert_eq!(
            invoice.ensure_deletable(),
            Err(BillingError::PaidInvoiceNotDeletable)
        );
        assert_eq!(
            invoice.apply_update(InvoiceUpdate::default(), Uuid::new_v4(), Utc::now()),
            Err(BillingError::PaidInvoiceLocked)
        );
    }

    #[test]
    fn bank_transfer_review_flow() {
        let admin = Uuid::new_v4();
        let mut invoice = sample();
        invoice
            .submit_transfer_proof("uploads/1700000000000.jpg".into(), Utc::now())
            .unwrap();
        assert_eq!(invoice.payment_method, Some(PaymentMethod::Bank));

        invoice
            .review_transfer(false, Some("Blurry receipt".into()), admin, Utc::now())
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::PaymentRejected);
        assert_eq!(invoice.admin_notes.as_deref(), Some("Blurry receipt"));

        invoice
            .review_transfer(true, Some("Matched statement".into()), admin, Utc::now())
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.payment_date.is_some());
        assert_eq!(
            invoice.review_transfer(true, None, admin, Utc::now()),
            Err(BillingError::AlreadyPaid)
        );
    }

    #[test]
    fn minor_units_round_half_cents() {
        let invoice = sample();
        assert_eq!(invoice.amount_minor(), Ok(2750));
    }

    #[test]
    fn wire_format_uses_snake_case_status_and_numbers() {
        let invoice = sample();
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total"], 27.5);
        assert_eq!(json["items"][1]["price"], 5.0);
        assert_eq!(
            serde_json::to_value(InvoiceStatus::PendingVerification).unwrap(),
            "pending_verification"
        );
        assert_eq!(
            InvoiceStatus::parse("PAYMENT_REJECTED"),
            Some(InvoiceStatus::PaymentRejected)
        );
    }
}
