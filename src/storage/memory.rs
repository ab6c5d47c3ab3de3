//! In-memory storage backend for testing and single-instance deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{PaymentRecord, PaymentStatus};
use crate::booking::Booking;
use crate::error::{ReservaError, Result, StorageError};
use crate::service::ServiceKind;
use crate::slots::{ScheduleEntry, Slot, SlotKey};

use super::traits::{BookingStore, PaymentStore, ScheduleStore, SlotStore};

/// In-memory store backing all four collections.
///
/// The reserve transition holds the slot map's write lock across the check
/// and the mutation, which gives the compare-and-swap semantics the trait
/// requires within a single process.
pub struct MemoryStore {
    slots: RwLock<HashMap<SlotKey, Slot>>,
    bookings: RwLock<HashMap<String, Booking>>,
    payments: RwLock<HashMap<String, PaymentRecord>>,
    schedule: RwLock<HashMap<String, ScheduleEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            bookings: RwLock::new(HashMap::new()),
            payments: RwLock::new(HashMap::new()),
            schedule: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn insert_slot(&self, slot: Slot) -> Result<()> {
        let mut slots = self.slots.write().unwrap();
        let key = slot.key();
        if slots.contains_key(&key) {
            return Err(StorageError::DuplicateKey(key.label()).into());
        }
        slots.insert(key, slot);
        Ok(())
    }

    async fn get_slot(&self, key: &SlotKey) -> Result<Option<Slot>> {
        let slots = self.slots.read().unwrap();
        Ok(slots.get(key).cloned())
    }

    async fn available_slots(
        &self,
        service: ServiceKind,
        from_date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        let slots = self.slots.read().unwrap();
        let mut rows: Vec<Slot> = slots
            .values()
            .filter(|s| s.service == service && s.available && s.date >= from_date)
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.date, s.start_minute));
        Ok(rows)
    }

    async fn try_reserve_slot(
        &self,
        key: &SlotKey,
        user_id: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut slots = self.slots.write().unwrap();
        let slot = slots
            .get_mut(key)
            .ok_or_else(|| ReservaError::not_found("slot", key.label()))?;

        if !slot.available {
            return Ok(false);
        }

        slot.available = false;
        slot.reserved_by = Some(user_id.to_string());
        slot.reserved_at = Some(at);
        slot.booking_id = Some(booking_id.to_string());
        Ok(true)
    }

    async fn release_slot(&self, key: &SlotKey) -> Result<()> {
        let mut slots = self.slots.write().unwrap();
        let slot = slots
            .get_mut(key)
            .ok_or_else(|| ReservaError::not_found("slot", key.label()))?;

        slot.available = true;
        slot.reserved_by = None;
        slot.reserved_at = None;
        slot.booking_id = None;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().unwrap();
        if bookings.contains_key(&booking.id) {
            return Err(StorageError::DuplicateKey(booking.id.clone()).into());
        }
        bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().unwrap();
        Ok(bookings.get(id).cloned())
    }

    async fn update_booking(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().unwrap();
        if !bookings.contains_key(&booking.id) {
            return Err(ReservaError::not_found("booking", booking.id.clone()));
        }
        bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn bookings_for_day(
        &self,
        service: ServiceKind,
        day: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().unwrap();
        let mut rows: Vec<Booking> = bookings
            .values()
            .filter(|b| b.service == service && b.day == day)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_minute);
        Ok(rows)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, record: PaymentRecord) -> Result<()> {
        let mut payments = self.payments.write().unwrap();
        if payments.contains_key(&record.external_reference) {
            return Err(StorageError::DuplicateKey(record.external_reference.clone()).into());
        }
        payments.insert(record.external_reference.clone(), record);
        Ok(())
    }

    async fn get_payment(&self, external_reference: &str) -> Result<Option<PaymentRecord>> {
        let payments = self.payments.read().unwrap();
        Ok(payments.get(external_reference).cloned())
    }

    async fn update_payment(&self, record: PaymentRecord) -> Result<()> {
        let mut payments = self.payments.write().unwrap();
        if !payments.contains_key(&record.external_reference) {
            return Err(ReservaError::not_found(
                "payment",
                record.external_reference.clone(),
            ));
        }
        payments.insert(record.external_reference.clone(), record);
        Ok(())
    }

    async fn payments_with_status(&self, status: PaymentStatus) -> Result<Vec<PaymentRecord>> {
        let payments = self.payments.read().unwrap();
        Ok(payments
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }

    async fn payments_for(
        &self,
        user_id: &str,
        service: ServiceKind,
    ) -> Result<Vec<PaymentRecord>> {
        let payments = self.payments.read().unwrap();
        Ok(payments
            .values()
            .filter(|p| p.user_id == user_id && p.service == service)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn insert_entry(&self, entry: ScheduleEntry) -> Result<()> {
        let mut schedule = self.schedule.write().unwrap();
        if schedule.contains_key(&entry.id) {
            return Err(StorageError::DuplicateKey(entry.id.clone()).into());
        }
        schedule.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn remove_entry(&self, id: &str) -> Result<bool> {
        let mut schedule = self.schedule.write().unwrap();
        Ok(schedule.remove(id).is_some())
    }

    async fn entries_for(&self, service: ServiceKind) -> Result<Vec<ScheduleEntry>> {
        let schedule = self.schedule.read().unwrap();
        let mut entries: Vec<ScheduleEntry> = schedule
            .values()
            .filter(|e| e.service == service)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.weekday.num_days_from_monday(), e.start_minute));
        Ok(entries)
    }
}
