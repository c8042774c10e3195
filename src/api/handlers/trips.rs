use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    extract::{Extension, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Booking, Trip, TripChanges, TripImage, TripSearch},
    error::{AppError, Result},
    service::TripDraft,
    web::uploads,
};

#[derive(Debug, Serialize)]
pub struct TripResponse {
    #[serde(flatten)]
    pub trip: Trip,
    pub image_url: Option<String>,
}

impl TripResponse {
    fn new(state: &AppState, trip: Trip) -> Self {
        let image_url = trip.image.as_ref().map(|_| {
            state
                .settings
                .server
                .absolute_url(&format!("/api/v1/trips/{}/image", trip.id))
        });
        Self { trip, image_url }
    }
}

#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<TripResponse>,
    pub total: usize,
}

/// Text fields and the optional image of a trip form.
#[derive(Default)]
struct TripForm {
    fields: HashMap<String, String>,
    image: Option<(String, Bytes)>,
}

impl TripForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = TripForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "image" {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read image: {}", e)))?;
                if !filename.is_empty() && !data.is_empty() {
                    form.image = Some((filename, data));
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid field {}: {}", name, e)))?;
            form.fields.insert(name, value);
        }

        Ok(form)
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.text(key)
            .ok_or_else(|| AppError::Validation(format!("{} is required", key)))
    }

    fn date(&self) -> Result<Option<NaiveDate>> {
        self.text("date")
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|_| {
                    AppError::Validation(format!("Invalid date: {}. Expected YYYY-MM-DD", d))
                })
            })
            .transpose()
    }

    fn int(&self, key: &str) -> Result<Option<i32>> {
        self.text(key)
            .map(|v| {
                v.parse::<i32>()
                    .map_err(|_| AppError::Validation(format!("{} must be a whole number", key)))
            })
            .transpose()
    }

    /// Price in cents, from either `price_cents` or a decimal `price`.
    fn price_cents(&self) -> Result<Option<i64>> {
        if let Some(cents) = self.text("price_cents") {
            return cents
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::Validation("price_cents must be a whole number".to_string()));
        }
        self.text("price")
            .map(|p| {
                p.parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite())
                    .map(|p| (p * 100.0).round() as i64)
                    .ok_or_else(|| AppError::Validation("price must be a number".to_string()))
            })
            .transpose()
    }

    async fn save_image(&self, state: &AppState) -> Result<Option<TripImage>> {
        match &self.image {
            Some((filename, data)) => {
                let image =
                    uploads::save_trip_image(&state.settings.server.uploads_dir, filename, data)
                        .await?;
                Ok(Some(image))
            }
            None => Ok(None),
        }
    }
}

async fn discard_image(state: &AppState, image: Option<&TripImage>) {
    if let Some(image) = image {
        if let Err(e) = uploads::delete_uploaded_file(&state.settings.server.uploads_dir, &image.path).await {
            tracing::warn!(path = %image.path, "Failed to discard unused upload: {}", e);
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(search): Query<TripSearch>,
) -> Result<Json<TripListResponse>> {
    let trips = state.service_context.trip_service.search(&search).await?;
    let trips: Vec<TripResponse> = trips.into_iter().map(|t| TripResponse::new(&state, t)).collect();
    let total = trips.len();
    Ok(Json(TripListResponse { trips, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripResponse>> {
    let trip = state.service_context.trip_service.get(id).await?;
    Ok(Json(TripResponse::new(&state, trip)))
}

pub async fn image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let trip = state.service_context.trip_service.get(id).await?;
    let image = trip
        .image
        .ok_or_else(|| AppError::NotFound("Trip has no image".to_string()))?;

    let path = uploads::resolve(&state.settings.server.uploads_dir, &image.path)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::warn!(trip_id = %id, path = %path.display(), "Trip image missing: {}", e);
        AppError::NotFound("Image not found".to_string())
    })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        body,
    )
        .into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TripResponse>)> {
    let form = TripForm::read(multipart).await?;

    let origin = form.require("origin")?;
    let destination = form.require("destination")?;
    let date = form
        .date()?
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    let time = form.require("time")?;
    let total_seats = form
        .int("total_seats")?
        .ok_or_else(|| AppError::Validation("total_seats is required".to_string()))?;
    let available_seats = form.int("available_seats")?;
    let price_cents = form
        .price_cents()?
        .ok_or_else(|| AppError::Validation("price is required".to_string()))?;

    let image = form.save_image(&state).await?;

    let draft = TripDraft {
        origin,
        destination,
        date,
        time,
        total_seats,
        available_seats,
        price_cents,
        image: image.clone(),
    };

    match state.service_context.trip_service.create(&current.principal(), draft).await {
        Ok(trip) => Ok((StatusCode::CREATED, Json(TripResponse::new(&state, trip)))),
        Err(e) => {
            discard_image(&state, image.as_ref()).await;
            Err(e)
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<TripResponse>> {
    let form = TripForm::read(multipart).await?;

    let mut changes = TripChanges {
        origin: form.text("origin"),
        destination: form.text("destination"),
        date: form.date()?,
        time: form.text("time"),
        total_seats: form.int("total_seats")?,
        price_cents: form.price_cents()?,
        image: None,
    };

    let image = form.save_image(&state).await?;
    changes.image = image.clone();

    match state.service_context.trip_service.update(&current.principal(), id, changes).await {
        Ok(trip) => Ok(Json(TripResponse::new(&state, trip))),
        Err(e) => {
            discard_image(&state, image.as_ref()).await;
            Err(e)
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.trip_service.delete(&current.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>> {
    let bookings = state
        .service_context
        .booking_service
        .list_active_for_trip(&current.principal(), id)
        .await?;
    Ok(Json(bookings))
}
