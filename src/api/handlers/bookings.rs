use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{
        extract::ApiJson,
        handlers::{payments::PaymentBody, tickets::ticket_download},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::{Booking, BookingDetails, Payment, Ticket},
    error::Result,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    #[validate(length(min = 1, message = "must list at least one seat"))]
    pub seats: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingDetails>,
    pub total: usize,
}

/// Result of a settled payment: the payment, the booking it paid for and
/// the ticket issued for it.
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub payment: Payment,
    pub booking: Booking,
    pub ticket: Ticket,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>)> {
    req.validate()?;

    let booking = state
        .service_context
        .booking_service
        .create(&current.principal(), req.trip_id, req.seats)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// One-step payment: records a successful payment and issues the ticket.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<PaymentBody>,
) -> Result<Json<ConfirmationResponse>> {
    let principal = current.principal();
    let ctx = &state.service_context;

    let (payment, booking) = ctx.payment_service.confirm(&principal, body.into_request()).await?;
    let ticket = ctx.ticket_service.ensure_issued(&principal, booking.id).await?;

    Ok(Json(ConfirmationResponse { payment, booking, ticket }))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<BookingListResponse>> {
    let bookings = state
        .service_context
        .booking_service
        .list_for_user(&current.principal())
        .await?;
    let total = bookings.len();
    Ok(Json(BookingListResponse { bookings, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>> {
    let details = state
        .service_context
        .booking_service
        .get(&current.principal(), id)
        .await?;
    Ok(Json(details))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>> {
    let booking = state
        .service_context
        .booking_service
        .cancel(&current.principal(), id)
        .await?;
    Ok(Json(booking))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>> {
    let booking = state
        .service_context
        .booking_service
        .complete(&current.principal(), id)
        .await?;
    Ok(Json(booking))
}

pub async fn payments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>> {
    let payments = state
        .service_context
        .payment_service
        .list_for_booking(&current.principal(), id)
        .await?;
    Ok(Json(payments))
}

pub async fn ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response> {
    let view = state
        .service_context
        .ticket_service
        .view_for_booking(&current.principal(), id)
        .await?;
    ticket_download(&view)
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<BookingListResponse>> {
    let bookings = state
        .service_context
        .booking_service
        .list_all(&current.principal())
        .await?;
    let total = bookings.len();
    Ok(Json(BookingListResponse { bookings, total }))
}
