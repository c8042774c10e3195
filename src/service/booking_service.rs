use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{authorize, Action, Principal, Resource},
    domain::{Booking, BookingDetails, NewBooking},
    error::{AppError, Result},
    repository::BookingRepository,
    service::trip_locks::TripLocks,
};

pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    locks: Arc<TripLocks>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>, locks: Arc<TripLocks>) -> Self {
        Self { repo, locks }
    }

    /// Books `seats` on the trip for the principal. Fails with
    /// `SeatConflict` when any seat is held by an active booking and with
    /// `CapacityExceeded` when the trip has fewer seats left than requested.
    pub async fn create(&self, principal: &Principal, trip_id: Uuid, seats: Vec<i32>) -> Result<Booking> {
        let _guard = self.locks.lock(trip_id).await;

        self.repo
            .create(NewBooking {
                user_id: principal.id,
                trip_id,
                seats,
            })
            .await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<BookingDetails> {
        let details = self
            .repo
            .find_details(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        authorize(
            principal,
            Resource::Booking { owner: details.booking.user_id },
            Action::View,
        )?;

        Ok(details)
    }

    /// Loads a booking the principal may act on.
    pub async fn require(&self, principal: &Principal, id: Uuid, action: Action) -> Result<Booking> {
        let booking = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        authorize(principal, Resource::Booking { owner: booking.user_id }, action)?;
        Ok(booking)
    }

    pub async fn cancel(&self, principal: &Principal, id: Uuid) -> Result<Booking> {
        let booking = self.require(principal, id, Action::Cancel).await?;

        let _guard = self.locks.lock(booking.trip_id).await;
        self.repo.cancel(id).await
    }

    pub async fn complete(&self, principal: &Principal, id: Uuid) -> Result<Booking> {
        let booking = self.require(principal, id, Action::Complete).await?;

        let _guard = self.locks.lock(booking.trip_id).await;
        let completed = self.repo.complete(id).await?;

        tracing::info!(booking_id = %id, "Booking completed");
        Ok(completed)
    }

    pub async fn list_for_user(&self, principal: &Principal) -> Result<Vec<BookingDetails>> {
        self.repo.list_for_user(principal.id).await
    }

    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<BookingDetails>> {
        authorize(principal, Resource::AllRecords, Action::View)?;
        self.repo.list_all().await
    }

    pub async fn list_active_for_trip(&self, principal: &Principal, trip_id: Uuid) -> Result<Vec<Booking>> {
        authorize(principal, Resource::AllRecords, Action::View)?;
        self.repo.list_active_for_trip(trip_id).await
    }
}
