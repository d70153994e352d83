mod common;

use assert_matches::assert_matches;
use futures::future::join_all;

use appointment_cell::models::*;

use common::{at, clinic, request};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_slot_yield_one_booking() {
    let clinic = clinic().await;

    let attempts = (0..16).map(|_| {
        let booking = clinic.booking.clone();
        let chair = clinic.chair;
        tokio::spawn(async move { booking.book_appointment(request(chair, at(9, 0), 30)).await })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for result in results.iter().filter(|result| result.is_err()) {
        assert_matches!(result, Err(AppointmentError::SlotConflict));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_requests_never_double_book() {
    let clinic = clinic().await;

    // Staggered 45-minute requests every 15 minutes across the morning.
    let attempts = (0..9).map(|step| {
        let booking = clinic.booking.clone();
        let chair = clinic.chair;
        let start = at(9, 0) + chrono::Duration::minutes(15 * step);
        tokio::spawn(async move { booking.book_appointment(request(chair, start, 45)).await })
    });

    let succeeded = join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();
    assert!(succeeded >= 1);

    let booked = clinic
        .booking
        .list_appointments(&AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(booked.len(), succeeded);

    for (i, a) in booked.iter().enumerate() {
        for b in &booked[i + 1..] {
            assert!(!a.slot().overlaps(&b.slot()), "{} overlaps {}", a.slot(), b.slot());
        }
    }
}
