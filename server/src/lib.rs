//! HTTP API for the Empire Run backoffice.
//!
//! Public routes serve the game client (cloud saves, gameplay reports,
//! license activation, moderation status) and the storefront (order
//! intake). Admin routes under `/api/admin` require the shared credential.

mod auth;
mod error;
mod extract;
mod routes;
mod state;

pub use auth::ADMIN_TOKEN_HEADER;
pub use error::{ApiError, ApiResult};
pub use routes::public::SERVICE_NAME;
pub use state::{AppState, ServerConfig};

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use routes::{admin, public};
use tower_http::trace::TraceLayer;

/// Build the HTTP API router over `state`.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/orders/approve", post(admin::approve_order))
        .route("/orders/cancel", post(admin::cancel_order))
        .route("/license-keys", get(admin::list_license_keys))
        .route("/ban/warn-device", post(admin::warn_device))
        .route("/ban/clear-warn", post(admin::clear_warn))
        .route("/ban/set-ban", post(admin::set_ban))
        .route("/ban/search", get(admin::search_devices))
        .route("/emails", get(admin::list_emails))
        .route("/saves", get(admin::list_saves))
        .route("/save", delete(admin::delete_save))
        .route("/email/{email}", delete(admin::delete_email))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/", get(public::root))
        .route("/status", get(public::status))
        .route("/api/cloud-save/sync", post(public::sync_save))
        .route("/api/cloud-save/fetch", get(public::fetch_save))
        .route("/api/cloud-save/list-by-email", get(public::list_saves_by_email))
        .route("/api/orders", post(public::create_order))
        .route("/api/license/activate", post(public::activate_license))
        .route("/api/report/{event}", post(public::report))
        .route("/api/device/status", get(public::device_status))
        .route("/api/device/ack-warning", post(public::ack_warning))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
