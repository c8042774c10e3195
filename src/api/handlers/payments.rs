use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        extract::ApiJson,
        handlers::bookings::ConfirmationResponse,
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::{Booking, Payment, PaymentMethod},
    error::Result,
    service::PaymentRequest,
};

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub booking_id: Uuid,
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
}

impl PaymentBody {
    pub fn into_request(self) -> PaymentRequest {
        PaymentRequest {
            booking_id: self.booking_id,
            amount_cents: self.amount_cents,
            method: self.method,
            transaction_id: self.transaction_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettleBody {
    pub payment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub total: usize,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<PaymentBody>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    let (payment, booking) = state
        .service_context
        .payment_service
        .create(&current.principal(), body.into_request())
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse { payment, booking })))
}

/// Settles a pending payment as successful and issues the ticket.
pub async fn confirm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<SettleBody>,
) -> Result<Json<ConfirmationResponse>> {
    let principal = current.principal();
    let ctx = &state.service_context;

    let (payment, booking) = ctx.payment_service.mark_success(&principal, body.payment_id).await?;
    let ticket = ctx.ticket_service.ensure_issued(&principal, booking.id).await?;

    Ok(Json(ConfirmationResponse { payment, booking, ticket }))
}

pub async fn fail(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<SettleBody>,
) -> Result<Json<PaymentResponse>> {
    let (payment, booking) = state
        .service_context
        .payment_service
        .mark_failed(&current.principal(), body.payment_id)
        .await?;

    Ok(Json(PaymentResponse { payment, booking }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>> {
    let payment = state
        .service_context
        .payment_service
        .get(&current.principal(), id)
        .await?;
    Ok(Json(payment))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PaymentListResponse>> {
    let payments = state
        .service_context
        .payment_service
        .list_all(&current.principal())
        .await?;
    let total = payments.len();
    Ok(Json(PaymentListResponse { payments, total }))
}
