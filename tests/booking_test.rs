#![allow(clippy::unwrap_used)]

mod common;

use common::{assert_slots_consistent, count, date, haircut, register, test_pool, time, times};
use slotbook::models::Role;
use slotbook::{availability, booking, db, AppError};

#[tokio::test]
async fn reserve_then_second_reserve_is_rejected() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let other = register(&pool, "other", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["09", "10", "11"]))
        .await
        .unwrap();

    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();
    assert_eq!(booking.client_id, client);
    assert_eq!(booking.professional_id, pro);

    let open = availability::list_open(&pool, pro, None, None).await.unwrap();
    let open_times: Vec<_> = open.iter().map(|s| s.time).collect();
    assert_eq!(open_times, vec![time("09"), time("11")]);

    let err = booking::reserve(&pool, other, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable));
    assert_eq!(count(&pool, "bookings").await, 1);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn cancel_reopens_the_slot_for_the_next_client() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let other = register(&pool, "other", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();

    let first = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();
    booking::cancel(&pool, client, first.id).await.unwrap();

    assert_eq!(count(&pool, "bookings").await, 0);
    let slot = availability::get(&pool, pro, first.slot_id).await.unwrap();
    assert!(slot.available);

    let second = booking::reserve(&pool, other, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();
    assert_eq!(second.slot_id, first.slot_id);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn professional_can_cancel_too() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    let cancelled = booking::cancel(&pool, pro, booking.id).await.unwrap();
    assert_eq!(cancelled.id, booking.id);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn outsider_cannot_cancel() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let outsider = register(&pool, "outsider", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    let err = booking::cancel(&pool, outsider, booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(count(&pool, "bookings").await, 1);
    let slot = availability::get(&pool, pro, booking.slot_id).await.unwrap();
    assert!(!slot.available);

    let err = booking::cancel(&pool, client, booking.id + 100).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn professionals_cannot_book_and_unknown_services_are_not_found() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let rival = register(&pool, "rival", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();

    let err = booking::reserve(&pool, rival, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The service exists but is not offered by `rival`.
    let err = booking::reserve(&pool, client, service.id, rival, date("2024-06-01"), time("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(count(&pool, "bookings").await, 0);
}

#[tokio::test]
async fn reschedule_moves_booking_and_swaps_flags() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10", "11"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    let moved = booking::reschedule(&pool, pro, booking.id, date("2024-06-01"), time("11"))
        .await
        .unwrap();
    assert_ne!(moved.slot_id, booking.slot_id);
    assert!(availability::get(&pool, pro, booking.slot_id).await.unwrap().available);
    assert!(!availability::get(&pool, pro, moved.slot_id).await.unwrap().available);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn failed_reschedule_keeps_the_old_slot_reserved() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    let err = booking::reschedule(&pool, pro, booking.id, date("2024-06-02"), time("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable));

    let details = booking::get_for_professional(&pool, pro, booking.id).await.unwrap();
    assert_eq!(details.slot_id, booking.slot_id);
    assert!(!availability::get(&pool, pro, booking.slot_id).await.unwrap().available);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn reschedule_to_the_current_time_is_a_no_op() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    let same = booking::reschedule(&pool, pro, booking.id, date("2024-06-01"), time("10:00"))
        .await
        .unwrap();
    assert_eq!(same.slot_id, booking.slot_id);
    assert_slots_consistent(&pool).await;
}

#[tokio::test]
async fn only_the_owning_professional_can_reschedule() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let rival = register(&pool, "rival", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10", "11"]))
        .await
        .unwrap();
    let booking = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();

    for caller in [rival, client] {
        let err = booking::reschedule(&pool, caller, booking.id, date("2024-06-01"), time("11"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
    assert_eq!(availability::list_open(&pool, pro, None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dashboards_list_bookings_in_slot_order() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-02")), &times(&["09"]))
        .await
        .unwrap();
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["15"]))
        .await
        .unwrap();
    booking::reserve(&pool, client, service.id, pro, date("2024-06-02"), time("09")).await.unwrap();
    booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("15")).await.unwrap();

    let mine = booking::list_for_client(&pool, client).await.unwrap();
    let dates: Vec<_> = mine.iter().map(|b| b.date).collect();
    assert_eq!(dates, vec![date("2024-06-01"), date("2024-06-02")]);
    assert_eq!(mine[0].service_name, "Haircut");
    assert_eq!(mine[0].professional_name, "pro Silva");

    let theirs = booking::list_for_professional(&pool, pro).await.unwrap();
    assert_eq!(theirs.len(), 2);
    assert_eq!(theirs[0].client_name, "client Silva");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let pool = db::connect(&url, 8).await.unwrap();
    db::migrate(&pool).await.unwrap();

    let pro = register(&pool, "pro", Role::Professional).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10"]))
        .await
        .unwrap();
    let mut clients = Vec::new();
    for n in 0..6 {
        clients.push(register(&pool, &format!("client{n}"), Role::Client).await);
    }

    let service_id = service.id;
    let attempts: Vec<_> = clients
        .into_iter()
        .map(|client| {
            let pool = pool.clone();
            tokio::spawn(async move {
                booking::reserve(&pool, client, service_id, pro, date("2024-06-01"), time("10")).await
            })
        })
        .collect();

    let mut won = 0;
    let mut lost = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::SlotUnavailable) => lost += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(lost, 5);
    assert_eq!(count(&pool, "bookings").await, 1);
    assert_slots_consistent(&pool).await;
}
