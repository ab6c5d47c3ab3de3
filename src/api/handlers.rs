//! REST API request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::access::{AccessTracker, PaymentStatus, PaymentUpdate};
use crate::booking::{Booking, BookingStatus, ReservationManager};
use crate::error::{ConflictError, ReservaError};
use crate::metrics::get_metrics;
use crate::service::{BookingKind, ServiceKind};
use crate::slots::{DayAvailability, GenerateOutcome, GenerateRequest, SlotCatalog};
use crate::storage::MemoryStore;
use crate::time::{to_minutes, to_time};

/// Application state shared across handlers.
pub struct ApiState {
    /// Slot catalog for generation and listing.
    pub catalog: SlotCatalog<MemoryStore>,
    /// Reservation manager for booking operations.
    pub manager: ReservationManager<MemoryStore>,
    /// Access tracker for payment ingestion and window checks.
    pub tracker: AccessTracker<MemoryStore>,
}

impl ApiState {
    /// Create new API state over a shared store.
    pub fn new(
        catalog: SlotCatalog<MemoryStore>,
        manager: ReservationManager<MemoryStore>,
        tracker: AccessTracker<MemoryStore>,
    ) -> Self {
        Self {
            catalog,
            manager,
            tracker,
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Slot listing query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    /// Service to list.
    pub service: ServiceKind,
    /// First date of the listing; defaults to today.
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    /// Maximum slots across all days.
    #[serde(default = "default_slot_limit")]
    pub limit: usize,
}

fn default_slot_limit() -> usize {
    30
}

/// Slot listing response.
#[derive(Debug, Clone, Serialize)]
pub struct SlotsResponse {
    pub days: Vec<DayAvailability>,
    pub total: usize,
}

/// Generation response.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl From<GenerateOutcome> for GenerateResponse {
    fn from(outcome: GenerateOutcome) -> Self {
        Self {
            created: outcome.created,
            skipped: outcome.skipped,
            errors: outcome.errors,
        }
    }
}

/// Booking creation request. Times cross the boundary as `HH:MM`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    #[serde(default)]
    pub kind: BookingKind,
    pub service: ServiceKind,
    pub date: NaiveDate,
    /// Start time as `HH:MM`.
    pub time: String,
    pub duration_minutes: u16,
}

/// Booking response.
#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: u16,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

impl BookingResponse {
    fn from_booking(booking: &Booking) -> Self {
        Self {
            id: booking.id.clone(),
            user_id: booking.user_id.clone(),
            service: booking.service,
            date: booking.day,
            time: to_time(booking.start_minute).unwrap_or_default(),
            duration_minutes: booking.duration_minutes,
            status: booking.status,
            meeting_link: booking.meeting_link.clone(),
        }
    }
}

/// Payment provider notification.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotificationRequest {
    /// Globally unique provider reference.
    pub external_reference: String,
    pub status: PaymentStatus,
    #[serde(flatten)]
    pub payload: PaymentUpdate,
}

/// Payment ingestion response.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub external_reference: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Access check query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessQuery {
    pub user_id: String,
    pub service: ServiceKind,
}

/// Notification feed query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedQuery {
    /// Evaluation instant; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Alternative start times as `HH:MM`, present on booking conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Map an engine error onto an HTTP status and stable error code.
fn error_response(err: &ReservaError) -> (StatusCode, ErrorResponse) {
    let (status, code, suggestions) = match err {
        ReservaError::Format(_) => (StatusCode::BAD_REQUEST, "invalid_format", None),
        ReservaError::Conflict(ConflictError::Overlap { suggestions, .. }) => (
            StatusCode::CONFLICT,
            "booking_conflict",
            Some(
                suggestions
                    .iter()
                    .filter_map(|&m| to_time(m).ok())
                    .collect(),
            ),
        ),
        ReservaError::Conflict(_) => (StatusCode::CONFLICT, "slot_unavailable", None),
        ReservaError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", None),
        ReservaError::Storage(crate::error::StorageError::DuplicateKey(_)) => {
            (StatusCode::CONFLICT, "duplicate_key", None)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
    };
    (
        status,
        ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
            suggestions,
        },
    )
}

fn error_into_response(err: &ReservaError) -> axum::response::Response {
    let (status, body) = error_response(err);
    (status, Json(body)).into_response()
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET /api/v1/slots - List available slots grouped by day.
pub async fn list_slots_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SlotsQuery>,
) -> impl IntoResponse {
    match state
        .catalog
        .list_available(params.service, params.from_date, params.limit)
        .await
    {
        Ok(days) => {
            let total = days.iter().map(|d| d.count).sum();
            (StatusCode::OK, Json(SlotsResponse { days, total })).into_response()
        }
        Err(e) => error_into_response(&e),
    }
}

/// POST /api/v1/slots/generate - Bulk-generate slots for a date range.
pub async fn generate_slots_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<GenerateRequest>,
) -> impl IntoResponse {
    match state.catalog.generate(&request).await {
        Ok(outcome) => (StatusCode::OK, Json(GenerateResponse::from(outcome))).into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// POST /api/v1/bookings - Create a booking, reserving its slot.
pub async fn create_booking_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateBookingRequest>,
) -> impl IntoResponse {
    let start_minute = match to_minutes(&request.time) {
        Ok(minute) => minute,
        Err(e) => return error_into_response(&e),
    };

    let new_booking = crate::booking::NewBooking {
        user_id: request.user_id,
        kind: request.kind,
        service: request.service,
        day: request.date,
        start_minute,
        duration_minutes: request.duration_minutes,
    };

    match state.manager.create_booking(new_booking).await {
        Ok(booking) => (
            StatusCode::CREATED,
            Json(BookingResponse::from_booking(&booking)),
        )
            .into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// POST /api/v1/bookings/:id/confirm - Confirm a pending booking.
pub async fn confirm_booking_handler(
    State(state): State<Arc<ApiState>>,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.confirm_booking(&booking_id).await {
        Ok(booking) => (
            StatusCode::OK,
            Json(BookingResponse::from_booking(&booking)),
        )
            .into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// DELETE /api/v1/bookings/:id - Cancel a booking, releasing its slot.
pub async fn cancel_booking_handler(
    State(state): State<Arc<ApiState>>,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.cancel_booking(&booking_id).await {
        Ok(booking) => (
            StatusCode::OK,
            Json(BookingResponse::from_booking(&booking)),
        )
            .into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// POST /api/v1/payments/notifications - Ingest a provider status event.
///
/// Safe under replay: the provider delivers at-least-once.
pub async fn payment_notification_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PaymentNotificationRequest>,
) -> impl IntoResponse {
    match state
        .tracker
        .apply_payment_update(&request.external_reference, request.status, request.payload)
        .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(PaymentResponse {
                external_reference: record.external_reference,
                status: record.status,
                expires_at: record.expires_at,
            }),
        )
            .into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// GET /api/v1/access - Current access window for a (user, service) pair.
pub async fn access_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<AccessQuery>,
) -> impl IntoResponse {
    match state
        .tracker
        .active_window(&params.user_id, params.service)
        .await
    {
        Ok(window) => (StatusCode::OK, Json(window)).into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// GET /api/v1/notifications/feed - Windows expiring or expired within 24h.
pub async fn notification_feed_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<FeedQuery>,
) -> impl IntoResponse {
    let at = params.at.unwrap_or_else(Utc::now);
    match state.tracker.notification_candidates(at).await {
        Ok(candidates) => (StatusCode::OK, Json(candidates)).into_response(),
        Err(e) => error_into_response(&e),
    }
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    (StatusCode::OK, get_metrics().render())
}
