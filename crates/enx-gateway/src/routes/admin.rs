use axum::{Json, extract::State};
use chrono::Utc;
use enx_billing::{InvoiceStatus, StatusSummary};
use enx_logistics::ShipmentStatus;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{auth::AdminUser, error::ApiError, state::AppState};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "P&D EnielExpress API is running",
        "timestamp": Utc::now(),
    }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "P&D EnielExpress API",
        "endpoints": {
            "auth": "/api/auth",
            "tracking": "/api/tracking",
            "items": "/api/items",
            "invoices": "/api/invoices",
            "payments": "/api/payments",
            "scan": "/api/scan",
            "whatsapp": "/api/whatsapp",
            "admin": "/api/admin",
            "health": "/api/health",
        },
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentCount {
    pub status: ShipmentStatus,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub status: InvoiceStatus,
    #[serde(flatten)]
    pub summary: StatusSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_shipments: u64,
    pub shipments: Vec<ShipmentCount>,
    pub total_invoices: u64,
    pub invoices: Vec<InvoiceSummary>,
}

/// Operations dashboard: one count per shipment status, count and amount
/// per invoice status.
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let shipments: Vec<ShipmentCount> = state
        .shipments
        .count_by_status()
        .await?
        .into_iter()
        .map(|(status, count)| ShipmentCount { status, count })
        .collect();
    let invoices: Vec<InvoiceSummary> = state
        .invoices
        .summary_by_status()
        .await?
        .into_iter()
        .map(|(status, summary)| InvoiceSummary { status, summary })
        .collect();

    Ok(Json(DashboardStats {
        total_shipments: shipments.iter().map(|entry| entry.count).sum(),
        shipments,
        total_invoices: invoices.iter().map(|entry| entry.summary.count).sum(),
        invoices,
    }))
}
