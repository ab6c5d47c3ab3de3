//! Storage trait definitions.
//!
//! The engine must be safe to run as multiple concurrent instances sharing
//! one persistent store, so the only true atomicity requirement — the slot
//! `available: true -> false` transition — is expressed as a single
//! conditional write behind [`SlotStore::try_reserve_slot`], never as a separate
//! read followed by a write.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{PaymentRecord, PaymentStatus};
use crate::booking::Booking;
use crate::error::Result;
use crate::service::ServiceKind;
use crate::slots::{ScheduleEntry, Slot, SlotKey};

/// Store for slot rows, keyed by (date, time, service).
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Insert a new slot. Fails with `StorageError::DuplicateKey` when a
    /// slot with the same key already exists.
    async fn insert_slot(&self, slot: Slot) -> Result<()>;

    /// Fetch a slot by key.
    async fn get_slot(&self, key: &SlotKey) -> Result<Option<Slot>>;

    /// All available slots of a service on or after `from_date`, sorted by
    /// date then time.
    async fn available_slots(&self, service: ServiceKind, from_date: NaiveDate)
        -> Result<Vec<Slot>>;

    /// Atomically transition the slot from free to reserved.
    ///
    /// Returns `Ok(true)` when this call won the transition, `Ok(false)`
    /// when the slot was already reserved, and `NotFound` when no such slot
    /// exists. Implementations must make the compare and the write one
    /// indivisible step.
    async fn try_reserve_slot(
        &self,
        key: &SlotKey,
        user_id: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Clear the reservation fields and mark the slot available again.
    /// A no-op on an already-free slot; `NotFound` when the row is missing.
    async fn release_slot(&self, key: &SlotKey) -> Result<()>;
}

/// Store for booking records.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new booking.
    async fn insert_booking(&self, booking: Booking) -> Result<()>;

    /// Fetch a booking by id.
    async fn get_booking(&self, id: &str) -> Result<Option<Booking>>;

    /// Replace an existing booking. `NotFound` when the id is unknown.
    async fn update_booking(&self, booking: Booking) -> Result<()>;

    /// All bookings of a service on a given day, any status.
    async fn bookings_for_day(&self, service: ServiceKind, day: NaiveDate)
        -> Result<Vec<Booking>>;
}

/// Store for the payment ledger, keyed by external reference.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new record. Fails with `StorageError::DuplicateKey` when the
    /// external reference is already present.
    async fn insert_payment(&self, record: PaymentRecord) -> Result<()>;

    /// Fetch a record by external reference.
    async fn get_payment(&self, external_reference: &str) -> Result<Option<PaymentRecord>>;

    /// Replace an existing record. `NotFound` when the reference is unknown.
    async fn update_payment(&self, record: PaymentRecord) -> Result<()>;

    /// All records with a given status.
    async fn payments_with_status(&self, status: PaymentStatus) -> Result<Vec<PaymentRecord>>;

    /// All records for a (user, service) pair.
    async fn payments_for(&self, user_id: &str, service: ServiceKind)
        -> Result<Vec<PaymentRecord>>;
}

/// Store for recurring weekly schedule entries.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert a schedule entry.
    async fn insert_entry(&self, entry: ScheduleEntry) -> Result<()>;

    /// Remove an entry by id. Returns whether an entry was removed.
    async fn remove_entry(&self, id: &str) -> Result<bool>;

    /// All entries for a service.
    async fn entries_for(&self, service: ServiceKind) -> Result<Vec<ScheduleEntry>>;
}
