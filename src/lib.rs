//! Reserva: Booking and Access-Window Engine
//!
//! Appointment slots, conflict-checked reservations, and payment-derived
//! subscription access windows for a small services platform.

pub mod access;
pub mod api;
pub mod booking;
pub mod cache;
pub mod conflict;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod slots;
pub mod storage;
pub mod time;

pub use access::{
    AccessTracker, AccessWindow, NotificationCandidate, NotificationKind, PaymentAnomaly,
    PaymentMetadata, PaymentRecord, PaymentStatus, PaymentUpdate, RenewalPolicy,
};
pub use api::{create_rest_router, ApiState, RestApiConfig};
pub use booking::{Booking, BookingStatus, NewBooking, ReservationManager};
pub use cache::{AvailabilityCache, AvailabilityKey};
pub use conflict::{
    conflicts, find_conflicts, suggest_slots, SuggestParams, TimeRange, DEFAULT_GRACE_MINUTES,
};
pub use config::Config;
pub use error::{ConfigError, ConflictError, FormatError, ReservaError, Result, StorageError};
pub use metrics::{get_metrics, Metrics};
pub use service::{BookingKind, ServiceKind};
pub use slots::{
    DayAvailability, GenerateOutcome, GenerateRequest, ScheduleEntry, Slot, SlotCatalog, SlotKey,
};
pub use storage::{BookingStore, MemoryStore, PaymentStore, ScheduleStore, SlotStore};
