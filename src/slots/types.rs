//! Slot and schedule-template types.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conflict::TimeRange;
use crate::service::ServiceKind;
use crate::time::to_time;

/// Uniqueness key of a slot: one bookable unit per (date, time, service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SlotKey {
    /// Calendar day, service-local.
    pub date: NaiveDate,
    /// Start time, minutes since midnight.
    pub start_minute: u16,
    /// The service the slot belongs to.
    pub service: ServiceKind,
}

impl SlotKey {
    /// Create a new slot key.
    pub fn new(date: NaiveDate, start_minute: u16, service: ServiceKind) -> Self {
        Self {
            date,
            start_minute,
            service,
        }
    }

    /// Render as `date@HH:MM/service` for logs and error messages.
    pub fn label(&self) -> String {
        format!(
            "{}@{}/{}",
            self.date,
            to_time(self.start_minute).unwrap_or_default(),
            self.service.display_name()
        )
    }
}

/// One bookable unit with availability state.
///
/// Invariant: `available == false` if and only if `reserved_by` and
/// `booking_id` are both set. Only the reservation manager mutates a slot
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Slot {
    /// Calendar day, service-local.
    pub date: NaiveDate,
    /// Start time, minutes since midnight.
    pub start_minute: u16,
    /// The service offered in this slot.
    pub service: ServiceKind,
    /// Session length in minutes.
    pub duration_minutes: u16,
    /// Price of the session.
    pub price: f64,
    /// Whether the slot can still be reserved.
    pub available: bool,
    /// User holding the reservation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<String>,
    /// When the reservation was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
    /// Booking created for the reservation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// When the slot row was created.
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// Create a new available slot.
    pub fn new(
        date: NaiveDate,
        start_minute: u16,
        service: ServiceKind,
        duration_minutes: u16,
        price: f64,
    ) -> Self {
        Self {
            date,
            start_minute,
            service,
            duration_minutes,
            price,
            available: true,
            reserved_by: None,
            reserved_at: None,
            booking_id: None,
            created_at: Utc::now(),
        }
    }

    /// The slot's uniqueness key.
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.start_minute, self.service)
    }

    /// The time range the slot occupies on the service calendar.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.date, self.start_minute, self.duration_minutes, self.service)
    }

    /// Check the availability/reservation consistency invariant.
    pub fn invariant_holds(&self) -> bool {
        let fully_reserved = self.reserved_by.is_some() && self.booking_id.is_some();
        let fully_free = self.reserved_by.is_none() && self.booking_id.is_none();
        if self.available {
            fully_free
        } else {
            fully_reserved
        }
    }
}

/// A recurring weekly schedule entry for a service.
///
/// Entries are independent rows with stable ids referencing their service,
/// so insertion and removal are indexed operations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleEntry {
    /// Stable identifier of the entry.
    pub id: String,
    /// The service this entry belongs to.
    pub service: ServiceKind,
    /// Day of week the entry recurs on.
    #[schemars(with = "String")]
    pub weekday: Weekday,
    /// Start time, minutes since midnight.
    pub start_minute: u16,
    /// Session length in minutes.
    pub duration_minutes: u16,
    /// Price of the derived slots.
    pub price: f64,
}

impl ScheduleEntry {
    /// Create a new schedule entry with a fresh id.
    pub fn new(
        service: ServiceKind,
        weekday: Weekday,
        start_minute: u16,
        duration_minutes: u16,
        price: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service,
            weekday,
            start_minute,
            duration_minutes,
            price,
        }
    }
}
