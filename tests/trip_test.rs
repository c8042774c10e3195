mod common;

use chrono::Duration;
use common::{draft, tomorrow};
use tripdesk::{
    domain::{Role, TripChanges, TripSearch},
    error::AppError,
};

#[tokio::test]
async fn test_search_filters_and_ordering() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let trips = &t.ctx.trip_service;
    let day = tomorrow();
    let later = day + Duration::days(3);

    let mut evening = draft("Pune", "Mumbai", day, 40, None, 60_000);
    evening.time = "19:15".to_string();
    let evening = trips.create(&admin, evening).await?;
    let morning = trips.create(&admin, draft("Pune", "Mumbai", day, 40, None, 30_000)).await?;
    let next = trips.create(&admin, draft("Pune", "Mumbai", later, 40, None, 45_000)).await?;
    trips.create(&admin, draft("Delhi", "Agra", day, 40, None, 20_000)).await?;

    let all = trips.search(&TripSearch::default()).await?;
    assert_eq!(all.len(), 4);

    let route = trips
        .search(&TripSearch {
            origin: Some("pune".to_string()),
            destination: Some("MUMBAI".to_string()),
            ..Default::default()
        })
        .await?;
    let ids: Vec<_> = route.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![morning.id, evening.id, next.id]);

    let on_day = trips
        .search(&TripSearch {
            origin: Some("Pune".to_string()),
            date: Some(later),
            ..Default::default()
        })
        .await?;
    assert_eq!(on_day.len(), 1);
    assert_eq!(on_day[0].id, next.id);

    // Price bounds are inclusive.
    let priced = trips
        .search(&TripSearch {
            min_price: Some(30_000),
            max_price: Some(45_000),
            ..Default::default()
        })
        .await?;
    let ids: Vec<_> = priced.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![morning.id, next.id]);

    assert!(matches!(
        trips
            .search(&TripSearch {
                min_price: Some(50_000),
                max_price: Some(10_000),
                ..Default::default()
            })
            .await,
        Err(AppError::Validation(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_trip_management_is_admin_only() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trips = &t.ctx.trip_service;

    assert!(matches!(
        trips.create(&alice, draft("Pune", "Goa", tomorrow(), 10, None, 100)).await,
        Err(AppError::Forbidden)
    ));

    let trip = t.trip(&admin, 10, 10).await?;
    assert!(matches!(
        trips.update(&alice, trip.id, TripChanges::default()).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(trips.delete(&alice, trip.id).await, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn test_create_validation() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let trips = &t.ctx.trip_service;

    assert!(matches!(
        trips.create(&admin, draft("Pune", "Goa", tomorrow(), 10, Some(11), 100)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        trips.create(&admin, draft("Pune", "Goa", tomorrow(), 0, None, 100)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        trips.create(&admin, draft("  ", "Goa", tomorrow(), 10, None, 100)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        trips.create(&admin, draft("Pune", "Goa", tomorrow(), 10, None, -1)).await,
        Err(AppError::Validation(_))
    ));

    let mut bad_time = draft("Pune", "Goa", tomorrow(), 10, None, 100);
    bad_time.time = "25:00".to_string();
    assert!(matches!(trips.create(&admin, bad_time).await, Err(AppError::Validation(_))));

    let trip = trips.create(&admin, draft(" Pune ", "Goa", tomorrow(), 10, None, 100)).await?;
    assert_eq!(trip.origin, "Pune");
    assert_eq!(trip.inventory.available_seats(), 10);

    Ok(())
}

#[tokio::test]
async fn test_resize_moves_availability() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let trips = &t.ctx.trip_service;

    t.ctx.booking_service.create(&alice, trip.id, vec![1, 2, 3, 4]).await?;

    let grown = trips
        .update(
            &admin,
            trip.id,
            TripChanges {
                total_seats: Some(15),
                price_cents: Some(50_000),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(grown.inventory.total_seats(), 15);
    assert_eq!(grown.inventory.available_seats(), 11);
    assert_eq!(grown.price_cents, 50_000);
    assert_eq!(grown.origin, "Pune");

    // Shrinking below the booked count floors availability at zero.
    let shrunk = trips
        .update(&admin, trip.id, TripChanges { total_seats: Some(3), ..Default::default() })
        .await?;
    assert_eq!(shrunk.inventory.total_seats(), 3);
    assert_eq!(shrunk.inventory.available_seats(), 0);

    assert!(matches!(
        trips
            .update(&admin, trip.id, TripChanges { total_seats: Some(0), ..Default::default() })
            .await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        trips
            .update(&admin, uuid::Uuid::new_v4(), TripChanges::default())
            .await,
        Err(AppError::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_blocked_by_upcoming_bookings() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let trips = &t.ctx.trip_service;
    let bookings = &t.ctx.booking_service;

    let booking = bookings.create(&alice, trip.id, vec![1]).await?;
    assert!(matches!(trips.delete(&admin, trip.id).await, Err(AppError::Conflict(_))));
    assert!(trips.get(trip.id).await.is_ok());

    bookings.cancel(&alice, booking.id).await?;
    trips.delete(&admin, trip.id).await?;

    assert!(matches!(trips.get(trip.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(trips.delete(&admin, trip.id).await, Err(AppError::NotFound(_))));

    // History survives without its trip.
    let details = bookings.get(&alice, booking.id).await?;
    assert!(details.trip.is_none());
    assert_eq!(details.booking.seats, vec![1]);

    Ok(())
}
