use std::sync::Arc;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    auth::{authorize, Action, Principal, Resource},
    domain::{validate_departure_time, NewTrip, SeatInventory, Trip, TripChanges, TripImage, TripSearch},
    error::{AppError, Result},
    repository::TripRepository,
    service::trip_locks::TripLocks,
    web::uploads,
};

/// Catalogue input before validation.
#[derive(Debug, Clone)]
pub struct TripDraft {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time: String,
    pub total_seats: i32,
    pub available_seats: Option<i32>,
    pub price_cents: i64,
    pub image: Option<TripImage>,
}

pub struct TripService {
    repo: Arc<dyn TripRepository>,
    locks: Arc<TripLocks>,
    uploads_dir: String,
}

impl TripService {
    pub fn new(repo: Arc<dyn TripRepository>, locks: Arc<TripLocks>, uploads_dir: String) -> Self {
        Self { repo, locks, uploads_dir }
    }

    pub async fn search(&self, search: &TripSearch) -> Result<Vec<Trip>> {
        if let (Some(min), Some(max)) = (search.min_price, search.max_price) {
            if min > max {
                return Err(AppError::Validation(
                    "min_price must not exceed max_price".to_string(),
                ));
            }
        }
        self.repo.search(search).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Trip> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
    }

    pub async fn create(&self, principal: &Principal, draft: TripDraft) -> Result<Trip> {
        authorize(principal, Resource::Trips, Action::Manage)?;

        let origin = required("origin", &draft.origin)?;
        let destination = required("destination", &draft.destination)?;
        check_time(&draft.time)?;
        check_price(draft.price_cents)?;

        let inventory = SeatInventory::with_available(
            draft.total_seats,
            draft.available_seats.unwrap_or(draft.total_seats),
        )?;

        let trip = self
            .repo
            .create(NewTrip {
                origin,
                destination,
                date: draft.date,
                time: draft.time,
                inventory,
                price_cents: draft.price_cents,
                image: draft.image,
            })
            .await?;

        tracing::info!(trip_id = %trip.id, origin = %trip.origin, destination = %trip.destination, "Trip created");
        Ok(trip)
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, changes: TripChanges) -> Result<Trip> {
        authorize(principal, Resource::Trips, Action::Manage)?;

        if let Some(ref origin) = changes.origin {
            required("origin", origin)?;
        }
        if let Some(ref destination) = changes.destination {
            required("destination", destination)?;
        }
        if let Some(ref time) = changes.time {
            check_time(time)?;
        }
        if let Some(price) = changes.price_cents {
            check_price(price)?;
        }

        let replaces_image = changes.image.is_some();

        let _guard = self.locks.lock(id).await;
        let previous = self.get(id).await?;
        let updated = self.repo.update(id, changes).await?;

        if replaces_image {
            if let Some(old) = previous.image {
                self.remove_image(&old).await;
            }
        }

        tracing::info!(
            trip_id = %id,
            total_seats = updated.inventory.total_seats(),
            available_seats = updated.inventory.available_seats(),
            "Trip updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<()> {
        authorize(principal, Resource::Trips, Action::Manage)?;

        let deleted = {
            let _guard = self.locks.lock(id).await;
            self.repo.delete(id).await?
        };

        if let Some(image) = deleted.image {
            self.remove_image(&image).await;
        }

        tracing::info!(trip_id = %id, "Trip deleted");
        Ok(())
    }

    async fn remove_image(&self, image: &TripImage) {
        if let Err(e) = uploads::delete_uploaded_file(&self.uploads_dir, &image.path).await {
            tracing::warn!(path = %image.path, "Failed to remove trip image: {}", e);
        }
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn check_time(time: &str) -> Result<()> {
    if !validate_departure_time(time) {
        return Err(AppError::Validation(format!(
            "Invalid departure time: {}. Expected HH:MM",
            time
        )));
    }
    Ok(())
}

fn check_price(price_cents: i64) -> Result<()> {
    if price_cents < 0 {
        return Err(AppError::Validation("Price must not be negative".to_string()));
    }
    Ok(())
}
