//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{
    access_handler, cancel_booking_handler, confirm_booking_handler, create_booking_handler,
    generate_slots_handler, list_slots_handler, metrics_handler, notification_feed_handler,
    payment_notification_handler, ApiState,
};

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS.
    pub enable_cors: bool,
    /// API prefix (e.g., "/api/v1").
    pub prefix: String,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            prefix: "/api/v1".to_string(),
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - GET    /api/v1/slots                    - List available slots
/// - POST   /api/v1/slots/generate           - Bulk-generate slots
/// - POST   /api/v1/bookings                 - Create a booking
/// - POST   /api/v1/bookings/:id/confirm     - Confirm a booking
/// - DELETE /api/v1/bookings/:id             - Cancel a booking
/// - POST   /api/v1/payments/notifications   - Ingest a payment event
/// - GET    /api/v1/access                   - Access window check
/// - GET    /api/v1/notifications/feed       - Expiring/expired windows
/// - GET    /metrics                         - Prometheus exposition
pub fn create_rest_router(state: Arc<ApiState>, config: &RestApiConfig) -> Router {
    let api_routes = Router::new()
        .route("/slots", get(list_slots_handler))
        .route("/slots/generate", post(generate_slots_handler))
        .route("/bookings", post(create_booking_handler))
        .route("/bookings/:id/confirm", post(confirm_booking_handler))
        .route("/bookings/:id", delete(cancel_booking_handler))
        .route("/payments/notifications", post(payment_notification_handler))
        .route("/access", get(access_handler))
        .route("/notifications/feed", get(notification_feed_handler))
        .with_state(state);

    let router = Router::new()
        .nest(&config.prefix, api_routes)
        .route("/metrics", get(metrics_handler));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(Any);

        router.layer(cors)
    } else {
        router
    }
}
