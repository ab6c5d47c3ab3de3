//! End-to-end booking flow: generate, list, reserve, conflict, cancel.

use std::sync::Arc;

use chrono::NaiveDate;

use reserva::{
    AvailabilityCache, BookingKind, Config, ConflictError, GenerateRequest, MemoryStore,
    NewBooking, ReservaError, ReservationManager, ServiceKind, SlotCatalog,
};

fn engine() -> (SlotCatalog<MemoryStore>, ReservationManager<MemoryStore>, Arc<MemoryStore>) {
    let mut config = Config::default();
    // Pin the wall clock to UTC so listing cutoffs are deterministic.
    config.booking.utc_offset_minutes = 0;

    let store = Arc::new(MemoryStore::new());
    let cache = AvailabilityCache::new(&config.cache);
    let catalog = SlotCatalog::new(store.clone(), cache.clone(), config.booking.clone());
    let manager = ReservationManager::new(store.clone(), cache, config.booking);
    (catalog, manager, store)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 6, 1).unwrap()
}

fn generate_request() -> GenerateRequest {
    GenerateRequest {
        service: ServiceKind::ConsultorioFinanciero,
        start_date: day(),
        end_date: day() + chrono::Duration::days(1),
        times: vec![600, 660, 840],
        price: 150.0,
        duration_minutes: 60,
        skip_weekends: false,
        skip_existing: true,
        weekdays: None,
    }
}

fn booking_at(minute: u16, user: &str) -> NewBooking {
    NewBooking {
        user_id: user.to_string(),
        kind: BookingKind::Advisory,
        service: ServiceKind::ConsultorioFinanciero,
        day: day(),
        start_minute: minute,
        duration_minutes: 60,
    }
}

#[tokio::test]
async fn test_generate_then_list_then_book() {
    let (catalog, manager, _) = engine();

    let outcome = catalog.generate(&generate_request()).await.unwrap();
    assert_eq!(outcome.created, 3);

    let listing = catalog
        .list_available(ServiceKind::ConsultorioFinanciero, None, 30)
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].times, vec!["10:00", "11:00", "14:00"]);

    let booking = manager.create_booking(booking_at(600, "user-a")).await.unwrap();
    assert_eq!(booking.start_minute, 600);

    // The booked slot disappears from the listing.
    let listing = catalog
        .list_available(ServiceKind::ConsultorioFinanciero, None, 30)
        .await
        .unwrap();
    assert_eq!(listing[0].times, vec!["11:00", "14:00"]);
}

#[tokio::test]
async fn test_grace_buffer_rejects_adjacent_booking_with_suggestions() {
    let (catalog, manager, _) = engine();
    catalog.generate(&generate_request()).await.unwrap();

    manager.create_booking(booking_at(600, "user-a")).await.unwrap();

    // 11:00 starts inside the grace-expanded 09:30-11:30 range.
    let err = manager
        .create_booking(booking_at(660, "user-b"))
        .await
        .unwrap_err();
    match err {
        ReservaError::Conflict(ConflictError::Overlap {
            conflicts,
            suggestions,
        }) => {
            assert_eq!(conflicts.len(), 1);
            assert!(suggestions.len() <= 5);
            // Suggested starts clear the expanded range on both sides.
            assert!(suggestions.iter().all(|&s| s >= 690 || s + 60 <= 570));
        }
        other => panic!("expected overlap, got {:?}", other),
    }

    // 14:00 clears the buffer and books fine.
    manager.create_booking(booking_at(840, "user-b")).await.unwrap();
}

#[tokio::test]
async fn test_cancel_restores_availability() {
    let (catalog, manager, _) = engine();
    catalog.generate(&generate_request()).await.unwrap();

    let booking = manager.create_booking(booking_at(600, "user-a")).await.unwrap();
    manager.cancel_booking(&booking.id).await.unwrap();

    let listing = catalog
        .list_available(ServiceKind::ConsultorioFinanciero, None, 30)
        .await
        .unwrap();
    assert!(listing[0].times.contains(&"10:00".to_string()));

    // Cancelled commitments do not block rebooking.
    let rebooked = manager.create_booking(booking_at(600, "user-b")).await.unwrap();
    assert_eq!(rebooked.user_id, "user-b");
}

#[tokio::test]
async fn test_services_do_not_contend() {
    let (catalog, manager, _) = engine();
    catalog.generate(&generate_request()).await.unwrap();
    let mut training = generate_request();
    training.service = ServiceKind::EntrenamientoPersonal;
    catalog.generate(&training).await.unwrap();

    manager.create_booking(booking_at(600, "user-a")).await.unwrap();

    // Same day and time on a different service is independent.
    let mut other = booking_at(600, "user-b");
    other.service = ServiceKind::EntrenamientoPersonal;
    manager.create_booking(other).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_booking_race_has_one_winner() {
    let (catalog, manager, store) = engine();
    catalog.generate(&generate_request()).await.unwrap();
    let manager = Arc::new(manager);

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.create_booking(booking_at(600, &format!("user-{i}"))).await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => winners.push(booking),
            Err(ReservaError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(winners.len(), 1);

    use reserva::{SlotKey, SlotStore};
    let slot = store
        .get_slot(&SlotKey::new(day(), 600, ServiceKind::ConsultorioFinanciero))
        .await
        .unwrap()
        .unwrap();
    assert!(!slot.available);
    assert_eq!(slot.booking_id.as_deref(), Some(winners[0].id.as_str()));
    assert!(slot.invariant_holds());
}
