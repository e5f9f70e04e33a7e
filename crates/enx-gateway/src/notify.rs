//! Best-effort customer notifications. Each call hands the sends to a
//! detached task and returns immediately; failures are logged and dropped.

use std::sync::Arc;

use enx_billing::Invoice;
use enx_core::{Messenger, templates};
use enx_logistics::{Shipment, TrackingEvent};
use tracing::warn;

pub fn dispatch(
    messenger: &Arc<dyn Messenger>,
    recipients: Vec<String>,
    body: String,
    kind: &'static str,
) {
    let messenger = Arc::clone(messenger);
    tokio::spawn(async move {
        for to in recipients {
            if to.trim().is_empty() {
                continue;
            }
            if let Err(err) = messenger.send_message(&to, &body).await {
                warn!(error = %err, to = %to, notification = kind, "notification not delivered");
            }
        }
    });
}

pub fn tracking_update(
    messenger: &Arc<dyn Messenger>,
    frontend_url: &str,
    recipients: Vec<String>,
    shipment: &Shipment,
    event: &TrackingEvent,
) {
    let body = templates::tracking_update(
        frontend_url,
        &shipment.tracking_number,
        event.status.as_str(),
        &event.location,
        event.description.as_deref().unwrap_or_default(),
    );
    dispatch(messenger, recipients, body, "tracking_update");
}

pub fn payment_confirmation(messenger: &Arc<dyn Messenger>, invoice: &Invoice) {
    let paid_on = invoice
        .payment_date
        .unwrap_or(invoice.updated_at)
        .format("%Y-%m-%d")
        .to_string();
    let body = templates::payment_confirmation(
        &invoice.invoice_number,
        &templates::format_currency(invoice.total, &invoice.currency),
        &paid_on,
    );
    dispatch(
        messenger,
        vec![invoice.customer_phone.clone()],
        body,
        "payment_confirmation",
    );
}
