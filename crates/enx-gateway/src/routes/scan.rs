use axum::{Json, extract::State};
use chrono::Utc;
use enx_logistics::{ScanType, ShipmentStatus, extract_tracking_number};
use enx_platform::contracts::{ScanLocationRequest, ScanRequest};
use serde_json::{Value, json};
use tracing::info;
use url::Url;

use crate::{
    auth::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiPath},
    notify,
    routes::tracking::{load_shipment, tracking_number_param},
    state::AppState,
    validation::Checks,
};

const QR_SERVICE: &str = "https://api.qrserver.com/v1/create-qr-code/";
const BARCODE_SERVICE: &str = "https://api.barcode.com/v1/barcode";

pub async fn process(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ScanRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let code = checks.required("code", payload.code.as_deref(), "Code is required");
    checks.finish()?;

    let kind = ScanType::from_hint(payload.kind.as_deref());
    let tracking_number = extract_tracking_number(&code.unwrap_or_default(), kind)?;
    let shipment = load_shipment(&state, &tracking_number).await?;

    Ok(Json(json!({
        "message": "Code processed successfully",
        "trackingNumber": tracking_number,
        "shipment": shipment,
    })))
}

pub async fn update_location(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<ScanLocationRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let tracking_number = checks.required(
        "trackingNumber",
        payload.tracking_number.as_deref(),
        "Tracking number is required",
    );
    let location = checks.required("location", payload.location.as_deref(), "Location is required");
    let status = match payload.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = ShipmentStatus::parse(raw);
            checks.check(parsed.is_some(), "status", "Invalid status");
            parsed
        }
    };
    checks.finish()?;
    let (Some(tracking_number), Some(location)) = (tracking_number, location) else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    let mut shipment = load_shipment(&state, &tracking_number).await?;
    let description = payload
        .description
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| format!("Scanned at {location}"));
    let event = shipment
        .record_scan(
            status,
            location,
            Some(description),
            Some(caller.principal.id),
            Utc::now(),
        )
        .clone();
    state.shipments.save(&shipment).await?;
    info!(
        tracking_number = %shipment.tracking_number,
        location = %event.location,
        status = event.status.as_str(),
        "shipment scanned"
    );

    notify::tracking_update(
        &state.messenger,
        &state.settings.frontend_url,
        shipment.notification_targets(),
        &shipment,
        &event,
    );

    Ok(Json(json!({
        "message": "Shipment location updated successfully",
        "shipment": shipment,
    })))
}

pub async fn qr_code(
    State(state): State<AppState>,
    ApiPath(tracking_number): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let tracking_number = tracking_number_param(&tracking_number)?;
    let shipment = load_shipment(&state, &tracking_number).await?;

    let qr_data = json!({
        "trackingNumber": shipment.tracking_number,
        "origin": shipment.origin,
        "destination": shipment.destination,
        "status": shipment.status,
    });
    let qr_url = Url::parse_with_params(
        QR_SERVICE,
        [("size", "200x200"), ("data", qr_data.to_string().as_str())],
    )
    .map_err(anyhow::Error::from)?;

    Ok(Json(json!({
        "message": "QR code generated successfully",
        "qrData": qr_data,
        "qrUrl": qr_url.as_str(),
    })))
}

pub async fn barcode(
    State(state): State<AppState>,
    ApiPath(tracking_number): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let tracking_number = tracking_number_param(&tracking_number)?;
    let shipment = load_shipment(&state, &tracking_number).await?;

    let barcode_url = Url::parse_with_params(
        BARCODE_SERVICE,
        [
            ("data", shipment.tracking_number.as_str()),
            ("type", "code128"),
        ],
    )
    .map_err(anyhow::Error::from)?;

    Ok(Json(json!({
        "message": "Barcode generated successfully",
        "barcodeData": shipment.tracking_number,
        "barcodeUrl": barcode_url.as_str(),
    })))
}
