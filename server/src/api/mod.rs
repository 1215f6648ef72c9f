//! API routes
//!
//! All business routes sit behind the identity middleware; `/health` is
//! public. Handlers return `ApiResult` so both business errors (`AppError`)
//! and infrastructure errors propagate with `?`.

pub mod fees;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod ws;

use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::error::ServiceError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, ServiceError>;

/// Default page size for list endpoints
pub(crate) fn default_limit() -> i32 {
    50
}

/// Query params for paginated list endpoints
#[derive(Debug, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i32,
    #[serde(default)]
    pub offset: i32,
}

impl ListQuery {
    /// Clamp to sane bounds regardless of what the client sent
    pub fn clamped(&self) -> (i32, i32) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let authed = Router::new()
        // Orders
        .route(
            "/api/orders",
            post(orders::create_order).get(orders::list_my_orders),
        )
        .route("/api/restaurant/orders", get(orders::list_restaurant_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/status", post(orders::update_status))
        .route("/api/orders/{id}/cancel", post(orders::cancel_order))
        .route(
            "/api/orders/{id}/pos-reference",
            put(orders::update_pos_reference),
        )
        // Reports
        .route(
            "/api/reports",
            post(reports::create_report).get(reports::list_reports),
        )
        .route("/api/reports/{id}/resolve", post(reports::resolve_report))
        .route("/api/reports/{id}/confirm", post(reports::confirm_report))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        // Service fees
        .route("/api/restaurants/{id}/fees/summary", get(fees::summary))
        .route(
            "/api/restaurants/{id}/fees/outstanding",
            get(fees::outstanding),
        )
        .route("/api/restaurants/{id}/fees/collect", post(fees::collect))
        // Realtime
        .route("/api/live/ws", get(ws::handle_ws))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
