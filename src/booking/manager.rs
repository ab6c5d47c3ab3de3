//! Reservation manager: the serialization point for all slot mutations.
//!
//! Conflict checking is read-then-decide and can race; the atomic slot
//! transition behind [`SlotStore::try_reserve_slot`] is what actually
//! guarantees at-most-one booking per slot. Every committing write is
//! followed by a synchronous availability-cache invalidation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::AvailabilityCache;
use crate::conflict::{find_conflicts, suggest_slots, TimeRange};
use crate::config::BookingConfig;
use crate::error::{ConflictError, FormatError, ReservaError, Result};
use crate::metrics::get_metrics;
use crate::slots::SlotKey;
use crate::storage::{BookingStore, SlotStore};
use crate::time::MINUTES_PER_DAY;

use super::types::{Booking, BookingStatus, NewBooking};

/// Performs slot reservations and booking lifecycle transitions.
pub struct ReservationManager<S> {
    store: Arc<S>,
    cache: AvailabilityCache,
    config: BookingConfig,
}

impl<S> ReservationManager<S>
where
    S: SlotStore + BookingStore,
{
    /// Create a new reservation manager.
    pub fn new(store: Arc<S>, cache: AvailabilityCache, config: BookingConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Atomically transition a slot from free to reserved.
    ///
    /// Exactly one of two concurrent calls for the same key succeeds; the
    /// loser gets a `ConflictError` and the slot is left untouched.
    pub async fn reserve(&self, key: &SlotKey, user_id: &str, booking_id: &str) -> Result<()> {
        let metrics = get_metrics();
        let won = self
            .store
            .try_reserve_slot(key, user_id, booking_id, Utc::now())
            .await?;

        if !won {
            metrics.reservation_conflicts_total.inc();
            return Err(ConflictError::SlotUnavailable(key.label()).into());
        }

        metrics.reservations_won_total.inc();
        self.cache.invalidate_service(key.service);
        debug!(slot = %key.label(), user_id, booking_id, "slot reserved");
        Ok(())
    }

    /// Reverse a reservation, clearing the reservation fields.
    pub async fn release(&self, key: &SlotKey) -> Result<()> {
        self.store.release_slot(key).await?;
        self.cache.invalidate_service(key.service);
        debug!(slot = %key.label(), "slot released");
        Ok(())
    }

    /// Create a booking: conflict-check against same-day commitments of the
    /// same service, then reserve the backing slot.
    ///
    /// When the conflict detector rejects, no slot mutation is attempted and
    /// the error carries the conflicting ranges plus suggested alternatives.
    /// When the reserve loses the race, the booking is not created and the
    /// caller should re-fetch availability.
    pub async fn create_booking(&self, request: NewBooking) -> Result<Booking> {
        // Range math is u16; a session must fit inside the day.
        let end = request.start_minute as u32 + request.duration_minutes as u32;
        if request.duration_minutes == 0 || end > MINUTES_PER_DAY as u32 {
            return Err(FormatError::Duration {
                start_minute: request.start_minute,
                duration_minutes: request.duration_minutes,
            }
            .into());
        }

        let metrics = get_metrics();
        let timer = metrics.reserve_duration_seconds.start_timer();

        let candidate = TimeRange::new(
            request.day,
            request.start_minute,
            request.duration_minutes,
            request.service,
        );

        let existing: Vec<TimeRange> = self
            .store
            .bookings_for_day(request.service, request.day)
            .await?
            .iter()
            .filter(|b| b.status.is_active())
            .map(|b| b.range())
            .collect();

        let conflicting = find_conflicts(&candidate, &existing, self.config.grace_minutes);
        if !conflicting.is_empty() {
            metrics.reservation_conflicts_total.inc();
            let suggestions = suggest_slots(
                request.day,
                request.duration_minutes,
                request.service,
                &existing,
                self.config.grace_minutes,
                &self.config.suggest_params(),
            );
            return Err(ConflictError::Overlap {
                conflicts: conflicting,
                suggestions,
            }
            .into());
        }

        let key = SlotKey::new(request.day, request.start_minute, request.service);
        let booking = Booking::new(
            request.user_id.clone(),
            request.kind,
            request.service,
            request.day,
            request.start_minute,
            request.duration_minutes,
        )
        .with_slot(key);

        self.reserve(&key, &request.user_id, &booking.id).await?;

        if let Err(err) = self.store.insert_booking(booking.clone()).await {
            // The slot must never stay linked to a booking that was not
            // persisted; roll the transition back before surfacing the error.
            let _ = self.store.release_slot(&key).await;
            self.cache.invalidate_service(key.service);
            return Err(err);
        }

        timer.observe_duration();
        info!(booking_id = %booking.id, slot = %key.label(), "booking created");
        Ok(booking)
    }

    /// Confirm a pending booking after payment or operator action.
    pub async fn confirm_booking(&self, id: &str) -> Result<Booking> {
        let mut booking = self
            .store
            .get_booking(id)
            .await?
            .ok_or_else(|| ReservaError::not_found("booking", id))?;

        if booking.status == BookingStatus::Pending {
            booking.status = BookingStatus::Confirmed;
            booking.updated_at = Utc::now();
            self.store.update_booking(booking.clone()).await?;
        }
        Ok(booking)
    }

    /// Cancel a booking and release its slot.
    ///
    /// Idempotent: cancelling an already-cancelled booking is a no-op.
    pub async fn cancel_booking(&self, id: &str) -> Result<Booking> {
        let mut booking = self
            .store
            .get_booking(id)
            .await?
            .ok_or_else(|| ReservaError::not_found("booking", id))?;

        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        self.store.update_booking(booking.clone()).await?;

        if let Some(key) = booking.slot_key {
            self.release(&key).await?;
        }

        get_metrics().bookings_cancelled_total.inc();
        info!(booking_id = %booking.id, "booking cancelled");
        Ok(booking)
    }

    /// Attach the externally provided meeting link.
    pub async fn set_meeting_link(&self, id: &str, link: impl Into<String>) -> Result<Booking> {
        let mut booking = self
            .store
            .get_booking(id)
            .await?
            .ok_or_else(|| ReservaError::not_found("booking", id))?;

        booking.meeting_link = Some(link.into());
        booking.updated_at = Utc::now();
        self.store.update_booking(booking.clone()).await?;
        Ok(booking)
    }
}
