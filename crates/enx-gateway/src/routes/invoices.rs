use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use enx_billing::{
    Invoice, InvoiceStatus, InvoiceUpdate, NewInvoice, NewInvoiceItem, StatusSummary,
    generate_invoice_number,
};
use enx_core::{Page, Paginated, Principal};
use enx_platform::contracts::{
    CreateInvoiceRequest, InvoiceItemInput, ListQuery, UpdateInvoiceRequest,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthUser, require_owner_or_admin},
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
    validation::{Checks, parse_id},
};

const PHONE_MESSAGE: &str = "Please provide a valid phone number";
const EMAIL_MESSAGE: &str = "Please provide a valid email";

pub(crate) async fn load_invoice(state: &AppState, id: Uuid) -> Result<Invoice, ApiError> {
    state
        .invoices
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice not found"))
}

fn require_invoice_owner(principal: &Principal, invoice: &Invoice) -> Result<(), ApiError> {
    if principal.is_admin() || invoice.is_owned_by(principal.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Access denied. You do not own this resource.",
        ))
    }
}

/// Line items as sent by clients. Totals are never read from the request.
fn line_items(
    checks: &mut Checks,
    items: Option<Vec<InvoiceItemInput>>,
) -> Option<Vec<NewInvoiceItem>> {
    let items = match items {
        Some(items) if !items.is_empty() => items,
        _ => {
            checks.fail("items", "At least one item is required");
            return None;
        }
    };

    let mut priced = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let description = checks.required(
            &format!("items[{index}].description"),
            item.description.as_deref(),
            "Item description is required",
        );
        let quantity = item.quantity.and_then(|quantity| u32::try_from(quantity).ok());
        let quantity = quantity.filter(|quantity| *quantity >= 1);
        checks.check(
            quantity.is_some(),
            &format!("items[{index}].quantity"),
            "Item quantity must be at least 1",
        );
        let price = checks.required_amount(
            &format!("items[{index}].price"),
            item.price,
            "Item price must be positive",
            "Item price must be positive",
        );
        if let (Some(description), Some(quantity), Some(price)) = (description, quantity, price) {
            priced.push(NewInvoiceItem {
                description,
                quantity,
                price,
            });
        }
    }
    Some(priced)
}

fn client_totals(
    checks: &mut Checks,
    subtotal: Option<Decimal>,
    tax: Option<Decimal>,
    total: Option<Decimal>,
) {
    checks.non_negative_amount("subtotal", subtotal, "Subtotal must be positive");
    checks.non_negative_amount("tax", tax, "Tax must be positive");
    checks.non_negative_amount("total", total, "Total must be positive");
}

fn currency_code(raw: Option<String>) -> Option<String> {
    raw.map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
}

pub async fn get_invoice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Invoice>, ApiError> {
    let id = parse_id(&id, "Invalid invoice ID")?;
    Ok(Json(load_invoice(&state, id).await?))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let principal = &caller.principal;
    let mut checks = Checks::new();
    let customer_id = match payload.customer_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => checks.id("customerId", Some(raw), "Invalid customer ID"),
        _ if principal.is_admin() => {
            checks.fail("customerId", "Customer ID is required");
            None
        }
        _ => Some(principal.id),
    };
    let customer_name = checks.required(
        "customerName",
        payload.customer_name.as_deref(),
        "Customer name is required",
    );
    let customer_email = checks.required_email(
        "customerEmail",
        payload.customer_email.as_deref(),
        "Customer email is required",
        EMAIL_MESSAGE,
    );
    let customer_phone = checks.required_phone(
        "customerPhone",
        payload.customer_phone.as_deref(),
        "Customer phone is required",
        PHONE_MESSAGE,
    );
    let customer_address = checks.required(
        "customerAddress",
        payload.customer_address.as_deref(),
        "Customer address is required",
    );
    let items = line_items(&mut checks, payload.items);
    client_totals(&mut checks, payload.subtotal, payload.tax, payload.total);
    let due_date = checks.date(
        "dueDate",
        payload.due_date.as_deref(),
        "Due date must be a valid date",
    );
    let shipment_id = match payload.shipment_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => checks.id("shipmentId", Some(raw), "Invalid shipment ID"),
        _ => None,
    };
    checks.finish()?;

    let (Some(customer_id), Some(items), Some(due_date)) = (customer_id, items, due_date) else {
        return Err(ApiError::bad_request("Validation failed"));
    };
    require_owner_or_admin(principal, Some(customer_id))?;

    if let Some(shipment_id) = shipment_id {
        if state.shipments.find_by_id(shipment_id).await?.is_none() {
            return Err(ApiError::not_found("Shipment not found"));
        }
    }

    let now = Utc::now();
    let input = NewInvoice {
        customer_id,
        customer_name: customer_name.unwrap_or_default(),
        customer_email: customer_email.unwrap_or_default(),
        customer_phone: customer_phone.unwrap_or_default(),
        customer_address: customer_address.unwrap_or_default(),
        items,
        currency: currency_code(payload.currency),
        due_date,
        shipment_id,
        notes: payload.notes.filter(|notes| !notes.trim().is_empty()),
    };
    let invoice = Invoice::create(input, generate_invoice_number(now), principal.id, now)?;
    state.invoices.insert(&invoice).await?;
    info!(invoice_number = %invoice.invoice_number, total = %invoice.total, "invoice created");

    if let Some(shipment_id) = invoice.shipment_id {
        link_shipment(&state, shipment_id, Some(invoice.id)).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Invoice created successfully",
            "invoice": invoice,
        })),
    ))
}

/// Second, independent write. The invoice is already stored, so a failure
/// here is logged and left for the next edit to repair.
async fn link_shipment(state: &AppState, shipment_id: Uuid, invoice_id: Option<Uuid>) {
    match state.shipments.set_invoice(shipment_id, invoice_id).await {
        Ok(true) => {}
        Ok(false) => warn!(shipment_id = %shipment_id, "linked shipment no longer exists"),
        Err(err) => warn!(
            error = %err,
            shipment_id = %shipment_id,
            "failed to update shipment invoice link"
        ),
    }
}

pub async fn update_invoice(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateInvoiceRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Invalid invoice ID")?;
    let mut checks = Checks::new();
    let customer_name = checks.not_blank(
        "customerName",
        payload.customer_name.as_deref(),
        "Customer name cannot be empty",
    );
    let customer_email = checks.optional_email(
        "customerEmail",
        payload.customer_email.as_deref(),
        EMAIL_MESSAGE,
    );
    let customer_phone = checks.optional_phone(
        "customerPhone",
        payload.customer_phone.as_deref(),
        PHONE_MESSAGE,
    );
    let customer_address = checks.not_blank(
        "customerAddress",
        payload.customer_address.as_deref(),
        "Customer address cannot be empty",
    );
    let items = match payload.items {
        Some(items) => line_items(&mut checks, Some(items)),
        None => None,
    };
    client_totals(&mut checks, payload.subtotal, payload.tax, payload.total);
    let due_date = match payload.due_date.as_deref() {
        Some(raw) => checks.date("dueDate", Some(raw), "Due date must be a valid date"),
        None => None,
    };
    checks.finish()?;

    let mut invoice = load_invoice(&state, id).await?;
    require_invoice_owner(&caller.principal, &invoice)?;

    let update = InvoiceUpdate {
        customer_name,
        customer_email,
        customer_phone,
        customer_address,
        items,
        due_date,
        notes: payload.notes,
    };
    invoice.apply_update(update, caller.principal.id, Utc::now())?;
    state.invoices.save(&invoice).await?;
    info!(invoice_number = %invoice.invoice_number, "invoice updated");

    Ok(Json(json!({
        "message": "Invoice updated successfully",
        "invoice": invoice,
    })))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Invalid invoice ID")?;
    let invoice = load_invoice(&state, id).await?;
    require_invoice_owner(&caller.principal, &invoice)?;
    invoice.ensure_deletable()?;

    if !state.invoices.delete(id).await? {
        return Err(ApiError::not_found("Invoice not found"));
    }
    if let Some(shipment_id) = invoice.shipment_id {
        link_shipment(&state, shipment_id, None).await;
    }
    info!(invoice_number = %invoice.invoice_number, "invoice deleted");

    Ok(Json(json!({ "message": "Invoice deleted successfully" })))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Invoice>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            InvoiceStatus::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid status"))?,
        ),
    };
    let page = Page::new(query.page, query.limit)?;
    let (invoices, total) = state.invoices.list(status, page).await?;
    Ok(Json(Paginated::new(invoices, page, total)))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let user_id = parse_id(&user_id, "Invalid user ID")?;
    require_owner_or_admin(&caller.principal, Some(user_id))?;
    Ok(Json(state.invoices.list_for_customer(user_id).await?))
}

pub async fn pdf(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Invalid invoice ID")?;
    let invoice = load_invoice(&state, id).await?;
    require_invoice_owner(&caller.principal, &invoice)?;

    Ok(Json(json!({
        "message": "PDF generated successfully",
        "pdfUrl": format!(
            "{}/invoices/{}.pdf",
            state.settings.frontend_url.trim_end_matches('/'),
            invoice.invoice_number
        ),
    })))
}

pub async fn send_email(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Invalid invoice ID")?;
    let invoice = load_invoice(&state, id).await?;
    require_invoice_owner(&caller.principal, &invoice)?;

    // No mail transport is configured; the dispatch is recorded only.
    info!(
        invoice_number = %invoice.invoice_number,
        to = %invoice.customer_email,
        "invoice email dispatched"
    );

    Ok(Json(json!({
        "message": "Invoice sent successfully",
        "invoice": invoice,
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusStats {
    pub status: InvoiceStatus,
    #[serde(flatten)]
    pub summary: StatusSummary,
}

pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<InvoiceStatusStats>>, ApiError> {
    let stats = state
        .invoices
        .summary_by_status()
        .await?
        .into_iter()
        .map(|(status, summary)| InvoiceStatusStats { status, summary })
        .collect();
    Ok(Json(stats))
}
