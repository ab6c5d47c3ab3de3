//! Booking types.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conflict::TimeRange;
use crate::service::{BookingKind, ServiceKind};
use crate::slots::SlotKey;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting payment or manual confirmation.
    #[default]
    Pending,
    /// Confirmed by payment or an operator.
    Confirmed,
    /// Cancelled; the slot has been released.
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still occupies calendar time.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// A confirmed or pending appointment, linked to at most one slot.
///
/// Invariant: `end == start + duration`; the end minute is always derived,
/// never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Booking {
    /// Unique identifier.
    pub id: String,
    /// User who owns the appointment.
    pub user_id: String,
    /// Advisory or training.
    pub kind: BookingKind,
    /// The service the appointment is booked on.
    pub service: ServiceKind,
    /// Calendar day, service-local.
    pub day: NaiveDate,
    /// Start time, minutes since midnight.
    pub start_minute: u16,
    /// Appointment length in minutes.
    pub duration_minutes: u16,
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// Meeting link filled in later by an external collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    /// The slot this booking reserved, when slot-backed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_key: Option<SlotKey>,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
    /// When the booking was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Create a new pending booking with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        kind: BookingKind,
        service: ServiceKind,
        day: NaiveDate,
        start_minute: u16,
        duration_minutes: u16,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            service,
            day,
            start_minute,
            duration_minutes,
            status: BookingStatus::Pending,
            meeting_link: None,
            slot_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the slot the booking reserves.
    pub fn with_slot(mut self, key: SlotKey) -> Self {
        self.slot_key = Some(key);
        self
    }

    /// End time, minutes since midnight.
    pub fn end_minute(&self) -> u16 {
        self.start_minute + self.duration_minutes
    }

    /// The time range the booking occupies on the service calendar.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.day, self.start_minute, self.duration_minutes, self.service)
    }
}

/// A validated booking request handed to the reservation manager.
#[derive(Debug, Clone)]
pub struct NewBooking {
    /// User requesting the appointment.
    pub user_id: String,
    /// Advisory or training.
    pub kind: BookingKind,
    /// Target service.
    pub service: ServiceKind,
    /// Calendar day, service-local.
    pub day: NaiveDate,
    /// Start time, minutes since midnight.
    pub start_minute: u16,
    /// Appointment length in minutes.
    pub duration_minutes: u16,
}
