//! Slot catalog: bulk generation and availability listing.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{AvailabilityCache, AvailabilityKey};
use crate::conflict::{find_conflicts, TimeRange};
use crate::config::BookingConfig;
use crate::error::Result;
use crate::metrics::get_metrics;
use crate::service::ServiceKind;
use crate::storage::{BookingStore, ScheduleStore, SlotStore};
use crate::time::{local_now, to_time, MINUTES_PER_DAY};

use super::types::Slot;

/// Bulk-generation request for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateRequest {
    /// Service to generate slots for.
    pub service: ServiceKind,
    /// First day of the range.
    pub start_date: NaiveDate,
    /// End of the range, exclusive.
    pub end_date: NaiveDate,
    /// Start times to create on each day, minutes since midnight.
    pub times: Vec<u16>,
    /// Price per slot.
    pub price: f64,
    /// Session length in minutes.
    pub duration_minutes: u16,
    /// Skip Saturdays and Sundays.
    #[serde(default)]
    pub skip_weekends: bool,
    /// Count already-existing slots as skipped instead of erroring.
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    /// Restrict generation to these weekdays, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<Vec<String>>")]
    pub weekdays: Option<Vec<Weekday>>,
}

fn default_true() -> bool {
    true
}

/// Per-item outcome counts of a generation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateOutcome {
    /// Slot rows created.
    pub created: usize,
    /// Rows skipped because they already existed or collided with a
    /// commitment.
    pub skipped: usize,
    /// Rows that failed for any other reason. Never aborts the batch.
    pub errors: usize,
}

/// Availability of one day, grouped for the listing boundary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DayAvailability {
    /// The day.
    pub date: NaiveDate,
    /// Free start times as `HH:MM`, ascending.
    pub times: Vec<String>,
    /// Number of free slots on the day.
    pub count: usize,
}

/// Catalog of bookable slots over a storage backend.
pub struct SlotCatalog<S> {
    store: Arc<S>,
    cache: AvailabilityCache,
    config: BookingConfig,
}

impl<S> SlotCatalog<S>
where
    S: SlotStore + BookingStore + ScheduleStore,
{
    /// Create a new catalog.
    pub fn new(store: Arc<S>, cache: AvailabilityCache, config: BookingConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Generate slot rows for every requested (day, time) pair.
    ///
    /// Failures are isolated per item: a bad row is counted, logged, and the
    /// batch continues. Out-of-range times and duplicate keys hit during the
    /// insert (a generation race) count as errors; only the `skip_existing`
    /// pre-check counts as skipped.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome> {
        let mut outcome = GenerateOutcome::default();
        let metrics = get_metrics();

        for day in days_in_range(request.start_date, request.end_date) {
            if request.skip_weekends && is_weekend(day) {
                continue;
            }
            if let Some(ref weekdays) = request.weekdays {
                if !weekdays.contains(&day.weekday()) {
                    continue;
                }
            }

            for &minute in &request.times {
                if !valid_session(minute, request.duration_minutes) {
                    warn!(
                        minute,
                        duration = request.duration_minutes,
                        "slot generation item out of range"
                    );
                    outcome.errors += 1;
                    metrics.generation_errors_total.inc();
                    continue;
                }

                let slot = Slot::new(
                    day,
                    minute,
                    request.service,
                    request.duration_minutes,
                    request.price,
                );
                let key = slot.key();

                if request.skip_existing && self.store.get_slot(&key).await?.is_some() {
                    outcome.skipped += 1;
                    metrics.slots_skipped_total.inc();
                    continue;
                }

                match self.store.insert_slot(slot).await {
                    Ok(()) => {
                        outcome.created += 1;
                        metrics.slots_generated_total.inc();
                    }
                    Err(err) => {
                        warn!(slot = %key.label(), error = %err, "slot generation item failed");
                        outcome.errors += 1;
                        metrics.generation_errors_total.inc();
                    }
                }
            }
        }

        debug!(
            service = request.service.display_name(),
            created = outcome.created,
            skipped = outcome.skipped,
            errors = outcome.errors,
            "slot generation finished"
        );
        Ok(outcome)
    }

    /// Derive slots from the service's recurring weekly schedule,
    /// intersected with existing commitments.
    ///
    /// A template occurrence that conflicts with a non-cancelled booking
    /// (grace applied) is counted as skipped rather than created.
    pub async fn generate_from_schedule(
        &self,
        service: ServiceKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<GenerateOutcome> {
        let entries = self.store.entries_for(service).await?;
        let mut outcome = GenerateOutcome::default();
        let metrics = get_metrics();

        for day in days_in_range(start_date, end_date) {
            let commitments: Vec<TimeRange> = self
                .store
                .bookings_for_day(service, day)
                .await?
                .iter()
                .filter(|b| b.status.is_active())
                .map(|b| b.range())
                .collect();

            for entry in entries.iter().filter(|e| e.weekday == day.weekday()) {
                if !valid_session(entry.start_minute, entry.duration_minutes) {
                    warn!(entry_id = %entry.id, "schedule entry out of range");
                    outcome.errors += 1;
                    metrics.generation_errors_total.inc();
                    continue;
                }

                let candidate =
                    TimeRange::new(day, entry.start_minute, entry.duration_minutes, service);
                if !find_conflicts(&candidate, &commitments, self.config.grace_minutes).is_empty() {
                    outcome.skipped += 1;
                    metrics.slots_skipped_total.inc();
                    continue;
                }

                let slot = Slot::new(
                    day,
                    entry.start_minute,
                    service,
                    entry.duration_minutes,
                    entry.price,
                );
                match self.store.insert_slot(slot).await {
                    Ok(()) => {
                        outcome.created += 1;
                        metrics.slots_generated_total.inc();
                    }
                    Err(err) => {
                        warn!(error = %err, "schedule-derived slot failed");
                        outcome.errors += 1;
                        metrics.generation_errors_total.inc();
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// List available slots on or after `from_date` (default: today),
    /// grouped by date and capped to `limit` slots.
    ///
    /// Only slots whose start lies strictly in the future, with the
    /// configured lead buffer applied, are offered regardless of `from_date`.
    /// All wall-clock decisions use the single configured service offset.
    pub async fn list_available(
        &self,
        service: ServiceKind,
        from_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<DayAvailability>> {
        let now = local_now(self.config.utc_offset_minutes);
        let from_date = from_date.unwrap_or_else(|| now.date());
        let key = AvailabilityKey {
            service,
            from_date,
            limit,
        };

        if let Some(cached) = self.cache.get(&key).await {
            return Ok((*cached).clone());
        }

        let cutoff = now + Duration::minutes(self.config.lead_buffer_minutes as i64);
        let slots = self.store.available_slots(service, from_date).await?;

        let mut grouped: Vec<DayAvailability> = Vec::new();
        let mut total = 0usize;
        for slot in slots {
            if slot_start(&slot) <= cutoff {
                continue;
            }
            if total >= limit {
                break;
            }

            let time = to_time(slot.start_minute)?;
            match grouped.last_mut() {
                Some(day) if day.date == slot.date => {
                    day.times.push(time);
                    day.count += 1;
                }
                _ => grouped.push(DayAvailability {
                    date: slot.date,
                    times: vec![time],
                    count: 1,
                }),
            }
            total += 1;
        }

        self.cache.set(key, grouped.clone()).await;
        Ok(grouped)
    }
}

fn valid_session(start_minute: u16, duration_minutes: u16) -> bool {
    duration_minutes > 0
        && start_minute as u32 + duration_minutes as u32 <= MINUTES_PER_DAY as u32
}

fn slot_start(slot: &Slot) -> NaiveDateTime {
    slot.date
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::minutes(slot.start_minute as i64))
        .unwrap_or_default()
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut current = start;
    std::iter::from_fn(move || {
        if current >= end {
            return None;
        }
        let day = current;
        current += Duration::days(1);
        Some(day)
    })
}
