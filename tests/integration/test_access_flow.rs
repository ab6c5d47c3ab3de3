//! End-to-end access flow: payment ingestion, window checks, notification
//! feed, replay and anomaly handling.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use reserva::{
    AccessTracker, Config, MemoryStore, PaymentMetadata, PaymentStatus, PaymentUpdate,
    ServiceKind,
};

fn tracker() -> AccessTracker<MemoryStore> {
    AccessTracker::new(Arc::new(MemoryStore::new()), Config::default().access)
}

fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn subscription(user: &str, transaction: DateTime<Utc>, expiry: DateTime<Utc>) -> PaymentUpdate {
    PaymentUpdate {
        user_id: user.to_string(),
        service: ServiceKind::SalaEnVivo,
        amount: 120.0,
        currency: "USD".to_string(),
        transaction_at: Some(transaction),
        expires_at: Some(expiry),
        metadata: Some(PaymentMetadata::Subscription {
            plan: "sala-mensual".to_string(),
        }),
    }
}

#[tokio::test]
async fn test_approved_payment_opens_window() {
    let tracker = tracker();
    tracker
        .apply_payment_update(
            "mp-001",
            PaymentStatus::Approved,
            subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12)),
        )
        .await
        .unwrap();

    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 3, 15, 0))
        .await
        .unwrap();
    assert!(window.active);
    assert_eq!(window.expires_at, Some(at(2025, 3, 31, 12)));

    // Other users and services are unaffected.
    let other = tracker
        .active_window_at("user-b", ServiceKind::SalaEnVivo, at(2025, 3, 15, 0))
        .await
        .unwrap();
    assert!(!other.active);
}

#[tokio::test]
async fn test_replayed_notification_changes_nothing() {
    let tracker = tracker();
    let payload = subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12));

    for _ in 0..3 {
        tracker
            .apply_payment_update("mp-001", PaymentStatus::Approved, payload.clone())
            .await
            .unwrap();
    }

    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 3, 15, 0))
        .await
        .unwrap();
    // Replays must not extend the window.
    assert_eq!(window.expires_at, Some(at(2025, 3, 31, 12)));
    assert!(tracker.anomalies().is_empty());
}

#[tokio::test]
async fn test_renewal_extends_active_window() {
    let tracker = tracker();
    tracker
        .apply_payment_update(
            "mp-001",
            PaymentStatus::Approved,
            subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12)),
        )
        .await
        .unwrap();

    // Renewal mid-window for another 30 days.
    tracker
        .apply_payment_update(
            "mp-002",
            PaymentStatus::Approved,
            subscription("user-a", at(2025, 3, 20, 12), at(2025, 4, 19, 12)),
        )
        .await
        .unwrap();

    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 4, 1, 0))
        .await
        .unwrap();
    assert!(window.active);
    // 30 days appended to the original March 31 expiry.
    assert_eq!(window.expires_at, Some(at(2025, 4, 30, 12)));
}

#[tokio::test]
async fn test_conflicting_terminal_replay_is_recorded_not_applied() {
    let tracker = tracker();
    tracker
        .apply_payment_update(
            "mp-001",
            PaymentStatus::Approved,
            subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12)),
        )
        .await
        .unwrap();

    tracker
        .apply_payment_update(
            "mp-001",
            PaymentStatus::Cancelled,
            subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12)),
        )
        .await
        .unwrap();

    // Access survives; the bad transition is only recorded.
    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 3, 15, 0))
        .await
        .unwrap();
    assert!(window.active);
    assert_eq!(tracker.anomalies().len(), 1);
    assert_eq!(tracker.anomalies()[0].external_reference, "mp-001");
}

#[tokio::test]
async fn test_feed_classifies_expiring_and_expired() {
    let tracker = tracker();
    let expiry_a = at(2025, 5, 10, 12);
    let expiry_b = at(2025, 5, 12, 12);

    tracker
        .apply_payment_update(
            "mp-001",
            PaymentStatus::Approved,
            subscription("user-a", at(2025, 4, 10, 12), expiry_a),
        )
        .await
        .unwrap();
    tracker
        .apply_payment_update(
            "mp-002",
            PaymentStatus::Approved,
            subscription("user-b", at(2025, 4, 12, 12), expiry_b),
        )
        .await
        .unwrap();

    // user-a expired 12 hours ago, user-b expires in 36 hours.
    let now = expiry_a + Duration::hours(12);
    let feed = tracker.notification_candidates(now).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].user_id, "user-a");
    assert_eq!(feed[0].kind, reserva::NotificationKind::Expired);

    // A day later user-a has aged out and user-b is expiring.
    let feed = tracker
        .notification_candidates(now + Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].user_id, "user-b");
    assert_eq!(feed[0].kind, reserva::NotificationKind::Expiring);
}

#[tokio::test]
async fn test_pending_then_approved_lifecycle() {
    let tracker = tracker();
    let payload = subscription("user-a", at(2025, 3, 1, 12), at(2025, 3, 31, 12));

    tracker
        .apply_payment_update("mp-001", PaymentStatus::Pending, payload.clone())
        .await
        .unwrap();
    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 3, 2, 0))
        .await
        .unwrap();
    assert!(!window.active);

    tracker
        .apply_payment_update("mp-001", PaymentStatus::Approved, payload)
        .await
        .unwrap();
    let window = tracker
        .active_window_at("user-a", ServiceKind::SalaEnVivo, at(2025, 3, 2, 0))
        .await
        .unwrap();
    assert!(window.active);
}
