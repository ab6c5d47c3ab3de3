//! Access-window tracking over the payment ledger.
//!
//! The tracker only reads and upserts payment records; it performs no
//! payment processing and sends no notifications. Provider notifications
//! are delivered at-least-once, so every ingestion path is keyed by the
//! globally unique external reference and safe under replay.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::AccessConfig;
use crate::error::{ReservaError, Result, StorageError};
use crate::metrics::get_metrics;
use crate::service::ServiceKind;
use crate::storage::PaymentStore;

use super::types::{
    AccessWindow, NotificationCandidate, NotificationKind, PaymentAnomaly, PaymentMetadata,
    PaymentRecord, PaymentStatus, PaymentUpdate, RenewalPolicy,
};

/// Computes subscription access windows and ingests payment-status events.
pub struct AccessTracker<S> {
    store: Arc<S>,
    config: AccessConfig,
    /// Terminal-to-terminal anomalies observed, for operator inspection.
    anomalies: RwLock<Vec<PaymentAnomaly>>,
}

impl<S> AccessTracker<S>
where
    S: PaymentStore,
{
    /// Create a new tracker.
    pub fn new(store: Arc<S>, config: AccessConfig) -> Self {
        Self {
            store,
            config,
            anomalies: RwLock::new(Vec::new()),
        }
    }

    /// The current access window for a (user, service) pair.
    pub async fn active_window(&self, user_id: &str, service: ServiceKind) -> Result<AccessWindow> {
        self.active_window_at(user_id, service, Utc::now()).await
    }

    /// The access window as of a given instant.
    ///
    /// Active iff an approved payment's expiry lies beyond `now`; the
    /// reported expiry is the maximum across all approved records, which
    /// covers a prior window that has not lapsed when a new one is created.
    pub async fn active_window_at(
        &self,
        user_id: &str,
        service: ServiceKind,
        now: DateTime<Utc>,
    ) -> Result<AccessWindow> {
        let max_expiry = self
            .store
            .payments_for(user_id, service)
            .await?
            .iter()
            .filter(|p| p.status == PaymentStatus::Approved)
            .filter_map(|p| p.expires_at)
            .max();

        Ok(match max_expiry {
            Some(expiry) => AccessWindow {
                active: expiry > now,
                expires_at: Some(expiry),
            },
            None => AccessWindow::inactive(),
        })
    }

    /// Classify every (user, service) window against the ±24h notification
    /// band around `now`. Windows outside the band are excluded. Read-only.
    pub async fn notification_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<NotificationCandidate>> {
        let approved = self
            .store
            .payments_with_status(PaymentStatus::Approved)
            .await?;

        // One window per (user, service): the maximal expiry.
        let mut windows: std::collections::HashMap<(String, ServiceKind), DateTime<Utc>> =
            std::collections::HashMap::new();
        for record in approved {
            let Some(expiry) = record.expires_at else {
                continue;
            };
            windows
                .entry((record.user_id.clone(), record.service))
                .and_modify(|current| *current = (*current).max(expiry))
                .or_insert(expiry);
        }

        let band = Duration::hours(self.config.notify_window_hours);
        let mut candidates: Vec<NotificationCandidate> = windows
            .into_iter()
            .filter_map(|((user_id, service), expires_at)| {
                let delta = expires_at - now;
                let kind = if delta >= Duration::zero() && delta <= band {
                    NotificationKind::Expiring
                } else if delta < Duration::zero() && delta >= -band {
                    NotificationKind::Expired
                } else {
                    return None;
                };
                Some(NotificationCandidate {
                    user_id,
                    service,
                    expires_at,
                    kind,
                })
            })
            .collect();

        candidates.sort_by_key(|c| (c.expires_at, c.user_id.clone()));
        Ok(candidates)
    }

    /// Idempotent upsert of a provider status notification, keyed by the
    /// external reference.
    ///
    /// A replay of an identical terminal status is a no-op. A notification
    /// attempting to move one terminal status to a different one is recorded
    /// as an anomaly, surfaced to operators, and not applied.
    pub async fn apply_payment_update(
        &self,
        external_reference: &str,
        new_status: PaymentStatus,
        payload: PaymentUpdate,
    ) -> Result<PaymentRecord> {
        get_metrics().payments_ingested_total.inc();

        let existing = match self.store.get_payment(external_reference).await? {
            Some(record) => record,
            None => {
                let record = self
                    .build_record(external_reference, new_status, &payload)
                    .await?;
                match self.store.insert_payment(record.clone()).await {
                    Ok(()) => {
                        debug!(external_reference, status = ?new_status, "payment record created");
                        return Ok(record);
                    }
                    // Two replays raced past the lookup; fall through to the
                    // canonical record.
                    Err(ReservaError::Storage(StorageError::DuplicateKey(_))) => self
                        .store
                        .get_payment(external_reference)
                        .await?
                        .ok_or_else(|| ReservaError::not_found("payment", external_reference))?,
                    Err(err) => return Err(err),
                }
            }
        };

        if existing.status == new_status && existing.status.is_terminal() {
            get_metrics().payment_replays_total.inc();
            debug!(external_reference, status = ?new_status, "terminal replay ignored");
            return Ok(existing);
        }

        // Out-of-order delivery: a late pending/in-process event after the
        // verdict landed. The terminal status stands.
        if existing.status.is_terminal() && !new_status.is_terminal() {
            get_metrics().payment_replays_total.inc();
            debug!(external_reference, stale = ?new_status, "stale notification ignored");
            return Ok(existing);
        }

        if existing.status.is_terminal() && new_status.is_terminal() {
            let anomaly = PaymentAnomaly {
                external_reference: external_reference.to_string(),
                existing_status: existing.status,
                attempted_status: new_status,
                observed_at: Utc::now(),
            };
            warn!(
                external_reference,
                existing = ?anomaly.existing_status,
                attempted = ?anomaly.attempted_status,
                "terminal-to-terminal payment transition rejected"
            );
            get_metrics().payment_anomalies_total.inc();
            self.anomalies.write().push(anomaly);
            return Ok(existing);
        }

        let mut updated = existing;
        updated.status = new_status;
        updated.amount = payload.amount;
        updated.currency = payload.currency.clone();
        if let Some(at) = payload.transaction_at {
            updated.transaction_at = at;
        }
        if let Some(metadata) = payload.metadata.clone() {
            updated.metadata = metadata;
        }
        if new_status == PaymentStatus::Approved {
            updated.expires_at = Some(
                self.resolve_expiry(
                    &updated.user_id,
                    updated.service,
                    updated.transaction_at,
                    payload.expires_at,
                )
                .await?,
            );
        }
        updated.updated_at = Utc::now();

        self.store.update_payment(updated.clone()).await?;
        debug!(external_reference, status = ?new_status, "payment record updated");
        Ok(updated)
    }

    /// Anomalies recorded since startup, newest last.
    pub fn anomalies(&self) -> Vec<PaymentAnomaly> {
        self.anomalies.read().clone()
    }

    async fn build_record(
        &self,
        external_reference: &str,
        status: PaymentStatus,
        payload: &PaymentUpdate,
    ) -> Result<PaymentRecord> {
        let now = Utc::now();
        let transaction_at = payload.transaction_at.unwrap_or(now);

        let expires_at = if status == PaymentStatus::Approved {
            Some(
                self.resolve_expiry(
                    &payload.user_id,
                    payload.service,
                    transaction_at,
                    payload.expires_at,
                )
                .await?,
            )
        } else {
            payload.expires_at
        };

        Ok(PaymentRecord {
            external_reference: external_reference.to_string(),
            user_id: payload.user_id.clone(),
            service: payload.service,
            amount: payload.amount,
            currency: payload.currency.clone(),
            status,
            transaction_at,
            expires_at,
            metadata: payload
                .metadata
                .clone()
                .unwrap_or(PaymentMetadata::Unknown {
                    payload: serde_json::Value::Null,
                }),
            created_at: now,
            updated_at: now,
        })
    }

    /// Resolve the expiry of an approved payment under the configured
    /// renewal policy.
    async fn resolve_expiry(
        &self,
        user_id: &str,
        service: ServiceKind,
        transaction_at: DateTime<Utc>,
        notified_expiry: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>> {
        let notified = notified_expiry
            .ok_or_else(|| StorageError::InvalidOperation("approved payment without expiry".into()))?;
        if notified <= transaction_at {
            return Err(StorageError::InvalidOperation(format!(
                "expiry {notified} not after transaction {transaction_at}"
            ))
            .into());
        }

        match self.config.renewal_policy {
            RenewalPolicy::Replace => Ok(notified),
            RenewalPolicy::Extend => {
                let current = self
                    .active_window_at(user_id, service, transaction_at)
                    .await?;
                match current.expires_at {
                    // Append the purchased duration to the unexpired window.
                    Some(expiry) if current.active => Ok(expiry + (notified - transaction_at)),
                    _ => Ok(notified),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn tracker() -> AccessTracker<MemoryStore> {
        AccessTracker::new(Arc::new(MemoryStore::new()), AccessConfig::default())
    }

    fn tracker_with(policy: RenewalPolicy) -> AccessTracker<MemoryStore> {
        AccessTracker::new(
            Arc::new(MemoryStore::new()),
            AccessConfig {
                renewal_policy: policy,
                ..Default::default()
            },
        )
    }

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    fn update(expiry: DateTime<Utc>, transaction: DateTime<Utc>) -> PaymentUpdate {
        PaymentUpdate {
            user_id: "user-a".to_string(),
            service: ServiceKind::SalaEnVivo,
            amount: 99.0,
            currency: "USD".to_string(),
            transaction_at: Some(transaction),
            expires_at: Some(expiry),
            metadata: Some(PaymentMetadata::Subscription {
                plan: "sala-mensual".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_active_window_between_transaction_and_expiry() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        let mid = tracker
            .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 1, 15))
            .await
            .unwrap();
        assert!(mid.active);
        assert_eq!(mid.expires_at, Some(at(2025, 1, 31)));

        let after = tracker
            .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 2, 1))
            .await
            .unwrap();
        assert!(!after.active);
    }

    #[tokio::test]
    async fn test_no_payments_means_inactive() {
        let tracker = tracker();
        let window = tracker
            .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 1, 1))
            .await
            .unwrap();
        assert_eq!(window, AccessWindow::inactive());
    }

    #[tokio::test]
    async fn test_window_stays_inactive_without_new_payments() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        // Once lapsed, every later instant stays inactive.
        for day in [1u32, 10, 20] {
            let window = tracker
                .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 2, day))
                .await
                .unwrap();
            assert!(!window.active);
        }
    }

    #[tokio::test]
    async fn test_rejected_payment_grants_no_access() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Rejected,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        let window = tracker
            .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 1, 15))
            .await
            .unwrap();
        assert!(!window.active);
    }

    #[tokio::test]
    async fn test_replayed_approval_is_noop() {
        let tracker = tracker();
        let payload = update(at(2025, 1, 31), at(2025, 1, 1));

        let first = tracker
            .apply_payment_update("ref-1", PaymentStatus::Approved, payload.clone())
            .await
            .unwrap();
        let second = tracker
            .apply_payment_update("ref-1", PaymentStatus::Approved, payload)
            .await
            .unwrap();

        // Same record, unchanged expiry, no extension applied twice.
        assert_eq!(first.expires_at, second.expires_at);
        assert_eq!(second.expires_at, Some(at(2025, 1, 31)));
        assert!(tracker.anomalies().is_empty());

        let records = tracker
            .store
            .payments_for("user-a", ServiceKind::SalaEnVivo)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_to_approved_transition() {
        let tracker = tracker();
        let created = tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Pending,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();
        assert_eq!(created.status, PaymentStatus::Pending);

        let approved = tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();
        assert_eq!(approved.status, PaymentStatus::Approved);
        assert_eq!(approved.expires_at, Some(at(2025, 1, 31)));
    }

    #[tokio::test]
    async fn test_late_pending_after_approval_is_ignored() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        let result = tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::InProcess,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        assert_eq!(result.status, PaymentStatus::Approved);
        assert!(tracker.anomalies().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_to_terminal_is_anomaly_not_applied() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        let result = tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Rejected,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        // The stored record keeps its approved status.
        assert_eq!(result.status, PaymentStatus::Approved);
        let anomalies = tracker.anomalies();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].existing_status, PaymentStatus::Approved);
        assert_eq!(anomalies[0].attempted_status, PaymentStatus::Rejected);
    }

    #[tokio::test]
    async fn test_extend_policy_appends_duration() {
        let tracker = tracker_with(RenewalPolicy::Extend);
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        // Renewal on Jan 15 for another 30 days while still active.
        let renewed = tracker
            .apply_payment_update(
                "ref-2",
                PaymentStatus::Approved,
                update(at(2025, 2, 14), at(2025, 1, 15)),
            )
            .await
            .unwrap();

        // 30 purchased days appended to the Jan 31 expiry.
        assert_eq!(renewed.expires_at, Some(at(2025, 3, 2)));
    }

    #[tokio::test]
    async fn test_replace_policy_overwrites_window() {
        let tracker = tracker_with(RenewalPolicy::Replace);
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 31), at(2025, 1, 1)),
            )
            .await
            .unwrap();

        let renewed = tracker
            .apply_payment_update(
                "ref-2",
                PaymentStatus::Approved,
                update(at(2025, 2, 14), at(2025, 1, 15)),
            )
            .await
            .unwrap();

        assert_eq!(renewed.expires_at, Some(at(2025, 2, 14)));
    }

    #[tokio::test]
    async fn test_expiry_must_follow_transaction() {
        let tracker = tracker();
        let err = tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 1, 1), at(2025, 1, 31)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservaError::Storage(StorageError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_notification_band() {
        let tracker = tracker();
        let expiry = at(2025, 6, 10);
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(expiry, at(2025, 5, 10)),
            )
            .await
            .unwrap();

        // Two hours before expiry: expiring.
        let before = tracker
            .notification_candidates(expiry - Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].kind, NotificationKind::Expiring);

        // Two hours after expiry: expired.
        let after = tracker
            .notification_candidates(expiry + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].kind, NotificationKind::Expired);

        // 48 hours after expiry: outside the band.
        let late = tracker
            .notification_candidates(expiry + Duration::hours(48))
            .await
            .unwrap();
        assert!(late.is_empty());

        // 48 hours before expiry: also outside.
        let early = tracker
            .notification_candidates(expiry - Duration::hours(48))
            .await
            .unwrap();
        assert!(early.is_empty());
    }

    #[tokio::test]
    async fn test_notification_uses_maximal_window_per_pair() {
        let tracker = tracker();
        tracker
            .apply_payment_update(
                "ref-1",
                PaymentStatus::Approved,
                update(at(2025, 6, 10), at(2025, 5, 10)),
            )
            .await
            .unwrap();
        // Second approval pushes the window past the band.
        tracker
            .apply_payment_update(
                "ref-2",
                PaymentStatus::Approved,
                update(at(2025, 7, 10), at(2025, 6, 9)),
            )
            .await
            .unwrap();

        let candidates = tracker
            .notification_candidates(at(2025, 6, 10) - Duration::hours(2))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}
