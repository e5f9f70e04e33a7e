//! HTTP surface for shipment tracking, invoicing and payments.

pub mod auth;
pub mod error;
pub mod extract;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod validation;

pub use auth::{Passwords, seed_admin};
pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, GatewaySettings, MAX_UPLOAD_BYTES, Stores};
