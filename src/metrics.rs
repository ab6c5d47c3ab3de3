//! Prometheus-compatible metrics for the Reserva engine.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// All metrics for the booking engine.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    // Counters
    /// Slots created by catalog generation.
    pub slots_generated_total: IntCounter,
    /// Slots skipped during catalog generation.
    pub slots_skipped_total: IntCounter,
    /// Per-item errors during catalog generation.
    pub generation_errors_total: IntCounter,
    /// Reservation attempts that won the slot transition.
    pub reservations_won_total: IntCounter,
    /// Reservation attempts rejected by conflict or lost race.
    pub reservation_conflicts_total: IntCounter,
    /// Bookings cancelled.
    pub bookings_cancelled_total: IntCounter,
    /// Payment notifications ingested.
    pub payments_ingested_total: IntCounter,
    /// Replayed provider notifications resolved as no-ops.
    pub payment_replays_total: IntCounter,
    /// Terminal-to-terminal anomalies recorded.
    pub payment_anomalies_total: IntCounter,
    /// Availability cache hits.
    pub cache_hits_total: IntCounter,
    /// Availability cache misses.
    pub cache_misses_total: IntCounter,

    // Gauges
    /// Uptime in seconds.
    pub uptime_seconds: IntGauge,

    // Histograms
    /// Duration of the reserve path in seconds.
    pub reserve_duration_seconds: Histogram,

    /// Server start time.
    start_time: RwLock<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let slots_generated_total = IntCounter::new(
            "reserva_slots_generated_total",
            "Slots created by catalog generation",
        )
        .expect("failed to create counter");

        let slots_skipped_total = IntCounter::new(
            "reserva_slots_skipped_total",
            "Slots skipped during catalog generation",
        )
        .expect("failed to create counter");

        let generation_errors_total = IntCounter::new(
            "reserva_generation_errors_total",
            "Per-item errors during catalog generation",
        )
        .expect("failed to create counter");

        let reservations_won_total = IntCounter::new(
            "reserva_reservations_won_total",
            "Reservation attempts that won the slot transition",
        )
        .expect("failed to create counter");

        let reservation_conflicts_total = IntCounter::new(
            "reserva_reservation_conflicts_total",
            "Reservation attempts rejected by conflict or lost race",
        )
        .expect("failed to create counter");

        let bookings_cancelled_total =
            IntCounter::new("reserva_bookings_cancelled_total", "Bookings cancelled")
                .expect("failed to create counter");

        let payments_ingested_total = IntCounter::new(
            "reserva_payments_ingested_total",
            "Payment notifications ingested",
        )
        .expect("failed to create counter");

        let payment_replays_total = IntCounter::new(
            "reserva_payment_replays_total",
            "Replayed provider notifications resolved as no-ops",
        )
        .expect("failed to create counter");

        let payment_anomalies_total = IntCounter::new(
            "reserva_payment_anomalies_total",
            "Terminal-to-terminal anomalies recorded",
        )
        .expect("failed to create counter");

        let cache_hits_total =
            IntCounter::new("reserva_cache_hits_total", "Availability cache hits")
                .expect("failed to create counter");

        let cache_misses_total =
            IntCounter::new("reserva_cache_misses_total", "Availability cache misses")
                .expect("failed to create counter");

        let uptime_seconds = IntGauge::new("reserva_uptime_seconds", "Uptime in seconds")
            .expect("failed to create gauge");

        let reserve_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "reserva_reserve_duration_seconds",
                "Duration of the reserve path in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("failed to create histogram");

        for collector in [
            &slots_generated_total,
            &slots_skipped_total,
            &generation_errors_total,
            &reservations_won_total,
            &reservation_conflicts_total,
            &bookings_cancelled_total,
            &payments_ingested_total,
            &payment_replays_total,
            &payment_anomalies_total,
            &cache_hits_total,
            &cache_misses_total,
        ] {
            registry
                .register(Box::new(collector.clone()))
                .expect("failed to register counter");
        }
        registry
            .register(Box::new(uptime_seconds.clone()))
            .expect("failed to register gauge");
        registry
            .register(Box::new(reserve_duration_seconds.clone()))
            .expect("failed to register histogram");

        Self {
            registry,
            slots_generated_total,
            slots_skipped_total,
            generation_errors_total,
            reservations_won_total,
            reservation_conflicts_total,
            bookings_cancelled_total,
            payments_ingested_total,
            payment_replays_total,
            payment_anomalies_total,
            cache_hits_total,
            cache_misses_total,
            uptime_seconds,
            reserve_duration_seconds,
            start_time: RwLock::new(Instant::now()),
        }
    }

    /// Refresh the uptime gauge and render all metrics in the Prometheus
    /// text exposition format.
    pub fn render(&self) -> String {
        let uptime = self.start_time.read().elapsed().as_secs();
        self.uptime_seconds.set(uptime as i64);

        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}
