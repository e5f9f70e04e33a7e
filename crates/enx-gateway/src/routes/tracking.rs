use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use enx_core::{Page, Paginated, templates};
use enx_logistics::{
    MAX_DISTANCE_KM, NewShipment, PackageType, ServiceType, Shipment, ShipmentStatus,
    distance_km, estimated_delivery, generate_tracking_number, is_tracking_number, shipping_cost,
    transit_days,
};
use enx_platform::contracts::{
    CreateShipmentRequest, ListQuery, QuoteRequest, SubscribeRequest, UpdateStatusRequest,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AdminUser, AuthUser, require_owner_or_admin},
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    notify,
    state::AppState,
    validation::{Checks, parse_id},
};

const PHONE_MESSAGE: &str = "Please provide a valid phone number";
const EMAIL_MESSAGE: &str = "Please provide a valid email";
const DISTANCE_TOO_LARGE: &str = "Distance cannot exceed 20040 km";

/// Tracking numbers in paths must look like `ENX` + nine digits; anything
/// else is rejected before a lookup.
pub(crate) fn tracking_number_param(raw: &str) -> Result<String, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request("Tracking number is required"));
    }
    if !value.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request("Tracking number must be alphanumeric"));
    }
    if !is_tracking_number(value) {
        return Err(ApiError::bad_request("Invalid tracking number"));
    }
    Ok(value.to_string())
}

pub(crate) async fn load_shipment(
    state: &AppState,
    tracking_number: &str,
) -> Result<Shipment, ApiError> {
    state
        .shipments
        .find_by_tracking_number(tracking_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Shipment not found"))
}

/// Public view: history newest first, the way tracking pages show it.
fn display(mut shipment: Shipment) -> Shipment {
    shipment.tracking_history = shipment.history_newest_first();
    shipment
}

pub async fn get_shipment(
    State(state): State<AppState>,
    ApiPath(tracking_number): ApiPath<String>,
) -> Result<Json<Shipment>, ApiError> {
    let tracking_number = tracking_number_param(&tracking_number)?;
    let shipment = load_shipment(&state, &tracking_number).await?;
    Ok(Json(display(shipment)))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut checks = Checks::new();
    let sender_name = checks.required(
        "senderName",
        payload.sender_name.as_deref(),
        "Sender name is required",
    );
    let sender_phone = checks.required_phone(
        "senderPhone",
        payload.sender_phone.as_deref(),
        "Sender phone is required",
        PHONE_MESSAGE,
    );
    let sender_email = checks.required_email(
        "senderEmail",
        payload.sender_email.as_deref(),
        "Sender email is required",
        EMAIL_MESSAGE,
    );
    let sender_address = checks.required(
        "senderAddress",
        payload.sender_address.as_deref(),
        "Sender address is required",
    );
    let recipient_name = checks.required(
        "recipientName",
        payload.recipient_name.as_deref(),
        "Recipient name is required",
    );
    let recipient_phone = checks.required_phone(
        "recipientPhone",
        payload.recipient_phone.as_deref(),
        "Recipient phone is required",
        PHONE_MESSAGE,
    );
    let recipient_email = checks.required_email(
        "recipientEmail",
        payload.recipient_email.as_deref(),
        "Recipient email is required",
        EMAIL_MESSAGE,
    );
    let recipient_address = checks.required(
        "recipientAddress",
        payload.recipient_address.as_deref(),
        "Recipient address is required",
    );
    let package_description = checks.required(
        "packageDescription",
        payload.package_description.as_deref(),
        "Package description is required",
    );
    let package_weight = checks.required_number(
        "packageWeight",
        payload.package_weight,
        "Package weight must be a number",
        "Package weight must be positive",
    );
    let package_value = checks.required_amount(
        "packageValue",
        payload.package_value,
        "Package value must be a number",
        "Package value must be positive",
    );
    checks.check(
        !payload.package_dimensions.as_ref().is_some_and(|d| d.has_negative_side()),
        "packageDimensions",
        "Package dimensions must be positive",
    );
    let package_type = match payload.package_type.as_deref() {
        None => Some(PackageType::default()),
        Some(raw) => {
            let parsed = PackageType::parse(raw);
            checks.check(parsed.is_some(), "packageType", "Invalid package type");
            parsed
        }
    };
    let service_type = payload.service_type.as_deref().and_then(ServiceType::parse);
    checks.check(service_type.is_some(), "serviceType", "Invalid service type");
    let origin = checks.required("origin", payload.origin.as_deref(), "Origin is required");
    let destination = checks.required(
        "destination",
        payload.destination.as_deref(),
        "Destination is required",
    );
    let requested_delivery = match payload.estimated_delivery.as_deref() {
        None => None,
        Some(raw) => checks.date(
            "estimatedDelivery",
            Some(raw),
            "Estimated delivery must be a valid date",
        ),
    };
    checks.bounded(
        "distanceKm",
        payload.distance_km,
        MAX_DISTANCE_KM,
        "Distance must be positive",
        DISTANCE_TOO_LARGE,
    );
    checks.finish()?;

    let (Some(service_type), Some(package_type)) = (service_type, package_type) else {
        return Err(ApiError::bad_request("Invalid service type"));
    };
    let now = Utc::now();
    let estimated = match requested_delivery {
        Some(at) => at,
        None => estimated_delivery(service_type, payload.distance_km.unwrap_or_default(), now)
            .ok_or_else(|| ApiError::bad_request(DISTANCE_TOO_LARGE))?,
    };

    let input = NewShipment {
        sender_name: sender_name.unwrap_or_default(),
        sender_phone: sender_phone.unwrap_or_default(),
        sender_email: sender_email.unwrap_or_default(),
        sender_address: sender_address.unwrap_or_default(),
        recipient_name: recipient_name.unwrap_or_default(),
        recipient_phone: recipient_phone.unwrap_or_default(),
        recipient_email: recipient_email.unwrap_or_default(),
        recipient_address: recipient_address.unwrap_or_default(),
        package_description: package_description.unwrap_or_default(),
        package_weight: package_weight.unwrap_or_default(),
        package_dimensions: payload.package_dimensions,
        package_value: package_value.unwrap_or_default(),
        package_type,
        service_type,
        origin: origin.unwrap_or_default(),
        destination: destination.unwrap_or_default(),
        estimated_delivery: estimated,
        notes: payload.notes.filter(|notes| !notes.trim().is_empty()),
    };
    let shipment = Shipment::create(input, generate_tracking_number(now), caller.principal.id, now);
    state.shipments.insert(&shipment).await?;
    info!(
        tracking_number = %shipment.tracking_number,
        created_by = %caller.principal.id,
        "shipment created"
    );

    if let Some(first) = shipment.tracking_history.first() {
        notify::tracking_update(
            &state.messenger,
            &state.settings.frontend_url,
            vec![shipment.sender_phone.clone()],
            &shipment,
            first,
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Shipment created successfully",
            "shipment": shipment,
        })),
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(tracking_number): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let tracking_number = tracking_number_param(&tracking_number)?;
    let mut checks = Checks::new();
    let status = match checks.required("status", payload.status.as_deref(), "Status is required") {
        Some(raw) => {
            let parsed = ShipmentStatus::parse(&raw);
            checks.check(parsed.is_some(), "status", "Invalid status");
            parsed
        }
        None => None,
    };
    let location = checks.required("location", payload.location.as_deref(), "Location is required");
    checks.finish()?;
    let Some(status) = status else {
        return Err(ApiError::bad_request("Invalid status"));
    };

    let mut shipment = load_shipment(&state, &tracking_number).await?;
    let event = shipment
        .record_event(
            status,
            location.unwrap_or_default(),
            payload.description.filter(|text| !text.trim().is_empty()),
            Some(caller.principal.id),
            Utc::now(),
        )
        .clone();
    state.shipments.save(&shipment).await?;
    info!(
        tracking_number = %shipment.tracking_number,
        status = status.as_str(),
        "shipment status updated"
    );

    notify::tracking_update(
        &state.messenger,
        &state.settings.frontend_url,
        shipment.notification_targets(),
        &shipment,
        &event,
    );

    Ok(Json(json!({
        "message": "Shipment status updated successfully",
        "shipment": shipment,
    })))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<Shipment>>, ApiError> {
    let user_id = parse_id(&user_id, "Invalid user ID")?;
    require_owner_or_admin(&caller.principal, Some(user_id))?;

    let email = if caller.principal.id == user_id {
        caller.principal.email.clone()
    } else {
        state
            .users
            .find_by_id(user_id)
            .await?
            .map(|user| user.email)
            .unwrap_or_default()
    };
    let shipments = state.shipments.list_for_user(user_id, &email).await?;
    Ok(Json(shipments))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Shipment>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            ShipmentStatus::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid status"))?,
        ),
    };
    let page = Page::new(query.page, query.limit)?;
    let (shipments, total) = state.shipments.list(status, page).await?;
    Ok(Json(Paginated::new(shipments, page, total)))
}

/// Shared by the tracking and WhatsApp subscribe endpoints.
pub(crate) async fn subscribe_phone(
    state: &AppState,
    tracking_number: &str,
    phone_number: Option<&str>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let phone = checks.required_phone(
        "phoneNumber",
        phone_number,
        "Phone number is required",
        PHONE_MESSAGE,
    );
    checks.finish()?;
    let phone = phone.unwrap_or_default();

    let mut shipment = load_shipment(state, tracking_number).await?;
    if shipment.subscribe(&phone) {
        shipment.updated_at = Utc::now();
        state.shipments.save(&shipment).await?;
        info!(tracking_number = %shipment.tracking_number, "notification subscriber added");
    }

    notify::dispatch(
        &state.messenger,
        vec![phone],
        templates::subscription_confirmation(&shipment.tracking_number),
        "subscription_confirmation",
    );

    Ok(Json(json!({
        "message": "Successfully subscribed to WhatsApp notifications",
        "trackingNumber": shipment.tracking_number,
    })))
}

pub async fn subscribe(
    State(state): State<AppState>,
    ApiPath(tracking_number): ApiPath<String>,
    ApiJson(payload): ApiJson<SubscribeRequest>,
) -> Result<Json<Value>, ApiError> {
    let tracking_number = tracking_number_param(&tracking_number)?;
    subscribe_phone(&state, &tracking_number, payload.phone_number.as_deref()).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    pub currency: &'static str,
    pub service_type: ServiceType,
    pub distance_km: f64,
    pub transit_days: i64,
    pub estimated_delivery: DateTime<Utc>,
}

pub async fn quote(ApiJson(payload): ApiJson<QuoteRequest>) -> Result<Json<Quote>, ApiError> {
    let mut checks = Checks::new();
    let weight = checks.required_number(
        "weight",
        payload.weight,
        "Weight is required",
        "Weight must be positive",
    );
    let service_type = payload.service_type.as_deref().and_then(ServiceType::parse);
    checks.check(service_type.is_some(), "serviceType", "Invalid service type");
    checks.check(
        !payload.dimensions.as_ref().is_some_and(|d| d.has_negative_side()),
        "dimensions",
        "Dimensions must be positive",
    );
    checks.bounded(
        "distance",
        payload.distance,
        MAX_DISTANCE_KM,
        "Distance must be positive",
        DISTANCE_TOO_LARGE,
    );
    checks.finish()?;
    let Some(service_type) = service_type else {
        return Err(ApiError::bad_request("Invalid service type"));
    };

    let distance = match (
        payload.distance,
        payload.origin_coordinates,
        payload.destination_coordinates,
    ) {
        (Some(distance), _, _) => distance,
        (None, Some(from), Some(to)) => distance_km(from, to),
        _ => 0.0,
    };
    let weight = weight.unwrap_or_default();
    let now = Utc::now();
    let estimated = estimated_delivery(service_type, distance, now)
        .ok_or_else(|| ApiError::bad_request(DISTANCE_TOO_LARGE))?;

    Ok(Json(Quote {
        shipping_cost: shipping_cost(weight, payload.dimensions.as_ref(), service_type, distance),
        currency: "USD",
        service_type,
        distance_km: (distance * 100.0).round() / 100.0,
        transit_days: transit_days(service_type, distance),
        estimated_delivery: estimated,
    }))
}
