use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use enx_logistics::{CategoryStats, Item, ItemCategory, NewItem};
use enx_platform::contracts::CreateItemRequest;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AdminUser, AuthUser},
    error::ApiError,
    extract::{ApiJson, ApiPath},
    state::AppState,
    validation::{Checks, parse_id},
};

pub async fn create_item(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut checks = Checks::new();
    let name = checks.required("name", payload.name.as_deref(), "Item name is required");
    checks.max_chars(
        "name",
        payload.name.as_deref(),
        100,
        "Item name cannot exceed 100 characters",
    );
    checks.max_chars(
        "description",
        payload.description.as_deref(),
        500,
        "Description cannot exceed 500 characters",
    );
    let category = payload.category.as_deref().and_then(ItemCategory::parse);
    checks.check(category.is_some(), "category", "Invalid category");
    let weight = checks.required_number(
        "weight",
        payload.weight,
        "Weight is required",
        "Weight must be positive",
    );
    checks.check(
        !payload.dimensions.as_ref().is_some_and(|d| d.has_negative_side()),
        "dimensions",
        "Dimensions must be positive",
    );
    checks.non_negative_amount("value", payload.value, "Value must be positive");
    let shipment_id = match payload.shipment_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            checks.id("shipmentId", Some(raw), "Invalid shipment ID")
        }
        _ => {
            checks.fail("shipmentId", "Shipment ID is required");
            None
        }
    };
    checks.finish()?;
    let (Some(category), Some(shipment_id)) = (category, shipment_id) else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    if state.shipments.find_by_id(shipment_id).await?.is_none() {
        return Err(ApiError::not_found("Shipment not found"));
    }

    let input = NewItem {
        name: name.unwrap_or_default(),
        description: payload.description.filter(|text| !text.trim().is_empty()),
        category,
        weight: weight.unwrap_or_default(),
        dimensions: payload.dimensions,
        value: payload.value.unwrap_or(Decimal::ZERO),
        currency: payload
            .currency
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| "USD".to_string()),
        fragile: payload.fragile.unwrap_or(false),
        hazardous: payload.hazardous.unwrap_or(false),
        requires_special_handling: payload.requires_special_handling.unwrap_or(false),
        special_handling_instructions: payload
            .special_handling_instructions
            .filter(|text| !text.trim().is_empty()),
        shipment_id,
    };
    let item = Item::create(input, caller.principal.id, Utc::now());
    state.items.insert(&item).await?;
    info!(item_id = %item.id, shipment_id = %shipment_id, "cargo item recorded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Item created successfully",
            "item": item,
        })),
    ))
}

pub async fn list_for_shipment(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(shipment_id): ApiPath<String>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let shipment_id = parse_id(&shipment_id, "Invalid shipment ID")?;
    let shipment = state
        .shipments
        .find_by_id(shipment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Shipment not found"))?;

    let principal = &caller.principal;
    if !principal.owns_or_admin(Some(shipment.created_by))
        && !shipment.involves_email(&principal.email)
    {
        return Err(ApiError::forbidden(
            "Access denied. You do not own this resource.",
        ));
    }

    Ok(Json(state.items.list_for_shipment(shipment_id).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<CategoryStats>>, ApiError> {
    Ok(Json(state.items.stats_by_category().await?))
}
