//! Explicit WhatsApp sends. Unlike the notifications fired by shipment and
//! payment handlers, these report messenger failures to the caller.

use axum::{Json, extract::State};
use chrono::Utc;
use enx_core::templates;
use enx_platform::contracts::{
    DeliveryNotificationRequest, PaymentConfirmationMessageRequest, SendMessageRequest,
    SubscribeRequest, TrackingUpdateMessageRequest,
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AdminUser, AuthUser},
    error::ApiError,
    extract::ApiJson,
    routes::tracking::{subscribe_phone, tracking_number_param},
    state::AppState,
    validation::{Checks, parse_datetime},
};

const PHONE_REQUIRED: &str = "Phone number is required";
const PHONE_INVALID: &str = "Please provide a valid phone number";

async fn send(
    state: &AppState,
    phone_number: &str,
    body: &str,
    message: &str,
) -> Result<Json<Value>, ApiError> {
    let receipt = state.messenger.send_message(phone_number, body).await?;
    info!(to = %receipt.to, message_id = ?receipt.message_id, "whatsapp message requested");
    Ok(Json(json!({
        "message": message,
        "result": receipt,
    })))
}

pub async fn send_message(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let phone = checks.required_phone(
        "phoneNumber",
        payload.phone_number.as_deref(),
        PHONE_REQUIRED,
        PHONE_INVALID,
    );
    let message = checks.required("message", payload.message.as_deref(), "Message is required");
    checks.finish()?;
    let (Some(phone), Some(message)) = (phone, message) else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    send(&state, &phone, &message, "Message sent successfully").await
}

pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SubscribeRequest>,
) -> Result<Json<Value>, ApiError> {
    let tracking_number = tracking_number_param(
        payload.tracking_number.as_deref().unwrap_or_default(),
    )?;
    subscribe_phone(&state, &tracking_number, payload.phone_number.as_deref()).await
}

pub async fn tracking_update(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(payload): ApiJson<TrackingUpdateMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let phone = checks.required_phone(
        "phoneNumber",
        payload.phone_number.as_deref(),
        PHONE_REQUIRED,
        PHONE_INVALID,
    );
    let tracking_number = checks.required(
        "trackingNumber",
        payload.tracking_number.as_deref(),
        "Tracking number is required",
    );
    let status = checks.required("status", payload.status.as_deref(), "Status is required");
    let location = checks.required("location", payload.location.as_deref(), "Location is required");
    checks.finish()?;
    let (Some(phone), Some(tracking_number), Some(status), Some(location)) =
        (phone, tracking_number, status, location)
    else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    let body = templates::tracking_update(
        &state.settings.frontend_url,
        &tracking_number,
        &status,
        &location,
        payload.description.as_deref().unwrap_or_default(),
    );
    send(&state, &phone, &body, "Tracking update sent successfully").await
}

pub async fn payment_confirmation(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(payload): ApiJson<PaymentConfirmationMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let phone = checks.required_phone(
        "phoneNumber",
        payload.phone_number.as_deref(),
        PHONE_REQUIRED,
        PHONE_INVALID,
    );
    let invoice_number = checks.required(
        "invoiceNumber",
        payload.invoice_number.as_deref(),
        "Invoice number is required",
    );
    let amount = checks.required_amount(
        "amount",
        payload.amount,
        "Amount is required",
        "Amount must be positive",
    );
    checks.finish()?;
    let (Some(phone), Some(invoice_number), Some(amount)) = (phone, invoice_number, amount) else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    let currency = payload
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or("USD")
        .to_ascii_uppercase();
    let paid_on = payload
        .payment_date
        .as_deref()
        .and_then(parse_datetime)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string();
    let body = templates::payment_confirmation(
        &invoice_number,
        &templates::format_currency(amount, &currency),
        &paid_on,
    );
    send(&state, &phone, &body, "Payment confirmation sent successfully").await
}

pub async fn delivery_notification(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(payload): ApiJson<DeliveryNotificationRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let phone = checks.required_phone(
        "phoneNumber",
        payload.phone_number.as_deref(),
        PHONE_REQUIRED,
        PHONE_INVALID,
    );
    let tracking_number = checks.required(
        "trackingNumber",
        payload.tracking_number.as_deref(),
        "Tracking number is required",
    );
    let recipient_name = checks.required(
        "recipientName",
        payload.recipient_name.as_deref(),
        "Recipient name is required",
    );
    checks.finish()?;
    let (Some(phone), Some(tracking_number), Some(recipient_name)) =
        (phone, tracking_number, recipient_name)
    else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    let delivery_time = payload
        .delivery_time
        .filter(|time| !time.trim().is_empty())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d %H:%M").to_string());
    let body = templates::delivery_notification(&tracking_number, &recipient_name, &delivery_time);
    send(&state, &phone, &body, "Delivery notification sent successfully").await
}

pub async fn status(State(state): State<AppState>, _admin: AdminUser) -> Json<Value> {
    Json(json!({
        "message": "WhatsApp status retrieved successfully",
        "status": state.messenger.status().await,
    }))
}
