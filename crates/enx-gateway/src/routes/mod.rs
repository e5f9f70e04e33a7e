use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{rate_limit::limit_auth_attempts, state::AppState};

pub mod admin;
pub mod auth;
pub mod invoices;
pub mod items;
pub mod payments;
pub mod scan;
pub mod tracking;
pub mod whatsapp;

/// Multipart framing around the proof image.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => layer.allow_origin(Any),
    }
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.settings.max_upload_bytes + MULTIPART_OVERHEAD;

    let credentials = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_auth_attempts,
        ));

    Router::new()
        .route("/api", get(admin::index))
        .route("/api/health", get(admin::health))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(auth::update_profile))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route(
            "/api/tracking",
            get(tracking::list_shipments).post(tracking::create_shipment),
        )
        .route("/api/tracking/quote", post(tracking::quote))
        .route("/api/tracking/user/{user_id}", get(tracking::list_for_user))
        .route("/api/tracking/{tracking_number}", get(tracking::get_shipment))
        .route(
            "/api/tracking/{tracking_number}/status",
            put(tracking::update_status),
        )
        .route(
            "/api/tracking/{tracking_number}/subscribe",
            post(tracking::subscribe),
        )
        .route("/api/items", post(items::create_item))
        .route("/api/items/stats", get(items::stats))
        .route(
            "/api/items/shipment/{shipment_id}",
            get(items::list_for_shipment),
        )
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/api/invoices/stats", get(invoices::stats))
        .route("/api/invoices/user/{user_id}", get(invoices::list_for_user))
        .route(
            "/api/invoices/{id}",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/api/invoices/{id}/pdf", get(invoices::pdf))
        .route("/api/invoices/{id}/send-email", post(invoices::send_email))
        .route("/api/payments/initialize", post(payments::initialize))
        .route("/api/payments/verify", post(payments::verify))
        .route(
            "/api/payments/bank-transfer",
            post(payments::bank_transfer).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/payments/verify-bank-transfer/{invoice_id}",
            put(payments::verify_bank_transfer),
        )
        .route("/api/payments/history/{user_id}", get(payments::history))
        .route("/api/scan/process", post(scan::process))
        .route("/api/scan/update-location", post(scan::update_location))
        .route("/api/scan/qr/{tracking_number}", get(scan::qr_code))
        .route("/api/scan/barcode/{tracking_number}", get(scan::barcode))
        .route("/api/whatsapp/send", post(whatsapp::send_message))
        .route("/api/whatsapp/subscribe", post(whatsapp::subscribe))
        .route(
            "/api/whatsapp/tracking-update",
            post(whatsapp::tracking_update),
        )
        .route(
            "/api/whatsapp/payment-confirmation",
            post(whatsapp::payment_confirmation),
        )
        .route(
            "/api/whatsapp/delivery-notification",
            post(whatsapp::delivery_notification),
        )
        .route("/api/whatsapp/status", get(whatsapp::status))
        .merge(credentials)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.frontend_url))
        .with_state(state)
}
