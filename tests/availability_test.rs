#![allow(clippy::unwrap_used)]

mod common;

use common::{count, date, haircut, register, test_pool, time, times};
use slotbook::models::Role;
use slotbook::{availability, booking, queries, AppError};

#[tokio::test]
async fn batch_skips_blanks_and_duplicates() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let service = haircut(&pool, pro).await;

    let created = availability::create_batch(
        &pool,
        pro,
        Some(service.id),
        Some(date("2024-06-01")),
        &times(&["09", "", "10", "10:00", " "]),
    )
    .await
    .unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|s| s.available));

    let again = availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["10", "11"]))
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].time, time("11"));
    assert_eq!(count(&pool, "slots").await, 3);
}

#[tokio::test]
async fn batch_requires_service_date_and_times() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let service = haircut(&pool, pro).await;

    let cases = [
        (None, Some(date("2024-06-01")), times(&["09"])),
        (Some(service.id), None, times(&["09"])),
        (Some(service.id), Some(date("2024-06-01")), times(&["", ""])),
        (Some(service.id), Some(date("2024-06-01")), times(&["nine"])),
    ];
    for (service_id, day, hours) in cases {
        let err = availability::create_batch(&pool, pro, service_id, day, &hours).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }
    assert_eq!(count(&pool, "slots").await, 0);
}

#[tokio::test]
async fn batch_rejects_foreign_services_and_clients() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let rival = register(&pool, "rival", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;

    let err = availability::create_batch(&pool, rival, Some(service.id), Some(date("2024-06-01")), &times(&["09"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = availability::create_batch(&pool, client, Some(service.id), Some(date("2024-06-01")), &times(&["09"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn list_open_filters_by_inclusive_range() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let service = haircut(&pool, pro).await;
    for day in ["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-04"] {
        availability::create_batch(&pool, pro, Some(service.id), Some(date(day)), &times(&["09"]))
            .await
            .unwrap();
    }

    let all = availability::list_open(&pool, pro, None, None).await.unwrap();
    assert_eq!(all.len(), 4);

    let middle = availability::list_open(&pool, pro, Some(date("2024-06-02")), Some(date("2024-06-03")))
        .await
        .unwrap();
    let days: Vec<_> = middle.iter().map(|s| s.date).collect();
    assert_eq!(days, vec![date("2024-06-02"), date("2024-06-03")]);

    let from_third = availability::list_open(&pool, pro, Some(date("2024-06-03")), None).await.unwrap();
    assert_eq!(from_third.len(), 2);
    let until_first = availability::list_open(&pool, pro, None, Some(date("2024-06-01"))).await.unwrap();
    assert_eq!(until_first.len(), 1);
}

#[tokio::test]
async fn update_moves_slot_without_touching_the_flag() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let rival = register(&pool, "rival", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["09"]))
        .await
        .unwrap();
    let booked = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("09"))
        .await
        .unwrap();

    let moved = availability::update(&pool, pro, booked.slot_id, date("2024-06-05"), time("16:30"))
        .await
        .unwrap();
    assert_eq!(moved.date, date("2024-06-05"));
    assert_eq!(moved.time, time("16:30"));
    assert!(!moved.available);

    let err = availability::update(&pool, rival, booked.slot_id, date("2024-06-06"), time("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn delete_refuses_reserved_slots() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let rival = register(&pool, "rival", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    let slots = availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["09", "10"]))
        .await
        .unwrap();
    let booked = booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("09"))
        .await
        .unwrap();

    let err = availability::delete(&pool, pro, booked.slot_id).await.unwrap_err();
    assert!(matches!(err, AppError::SlotBooked));

    let open = slots.iter().find(|s| s.id != booked.slot_id).unwrap();
    let err = availability::delete(&pool, rival, open.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    availability::delete(&pool, pro, open.id).await.unwrap();
    assert_eq!(count(&pool, "slots").await, 1);
    assert_eq!(count(&pool, "bookings").await, 1);
}

#[tokio::test]
async fn lookup_and_open_slot_query() {
    let pool = test_pool().await;
    let pro = register(&pool, "pro", Role::Professional).await;
    let client = register(&pool, "client", Role::Client).await;
    let service = haircut(&pool, pro).await;
    availability::create_batch(&pool, pro, Some(service.id), Some(date("2024-06-01")), &times(&["09", "10"]))
        .await
        .unwrap();

    let found = availability::lookup_for_booking(&pool, pro, Some(service.id), date("2024-06-01"), time("10"))
        .await
        .unwrap();
    assert!(found.is_some());
    let other_service = availability::lookup_for_booking(&pool, pro, Some(service.id + 1), date("2024-06-01"), time("10"))
        .await
        .unwrap();
    assert!(other_service.is_none());

    booking::reserve(&pool, client, service.id, pro, date("2024-06-01"), time("10"))
        .await
        .unwrap();
    let gone = availability::lookup_for_booking(&pool, pro, None, date("2024-06-01"), time("10"))
        .await
        .unwrap();
    assert!(gone.is_none());

    let open = queries::open_slots(&pool, Some(pro), Some(date("2024-06-01"))).await.unwrap();
    assert_eq!(open, vec![time("09")]);
    assert!(queries::open_slots(&pool, None, Some(date("2024-06-01"))).await.unwrap().is_empty());
    assert!(queries::open_slots(&pool, Some(pro), None).await.unwrap().is_empty());
    assert!(queries::professionals_for_service(&pool, None).await.unwrap().is_empty());
}

#[test]
fn hour_options_cover_the_working_day() {
    let hours = availability::hour_options();
    assert_eq!(hours.first().map(String::as_str), Some("08"));
    assert_eq!(hours.last().map(String::as_str), Some("18"));
    assert_eq!(hours.len(), 11);
}
