use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{authorize, Action, Principal, Resource},
    domain::{
        generate_transaction_id, Booking, NewPayment, Payment, PaymentMethod, PaymentStatus,
        Settlement,
    },
    error::{AppError, Result},
    repository::{BookingRepository, PaymentRepository, TripRepository},
    service::trip_locks::TripLocks,
};

/// Prefix of transaction ids generated for one-step mock confirmations.
pub const MOCK_PREFIX: &str = "MOCK";
/// Prefix of transaction ids generated for two-step payment attempts.
pub const ATTEMPT_PREFIX: &str = "PAY";

#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    pub booking_id: Uuid,
    /// Amount the caller expects to pay. When present it must match the
    /// booking total; the stored amount is always the derived total.
    pub amount_cents: Option<i64>,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
}

pub struct PaymentService {
    repo: Arc<dyn PaymentRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    trip_repo: Arc<dyn TripRepository>,
    locks: Arc<TripLocks>,
}

impl PaymentService {
    pub fn new(
        repo: Arc<dyn PaymentRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        trip_repo: Arc<dyn TripRepository>,
        locks: Arc<TripLocks>,
    ) -> Self {
        Self { repo, booking_repo, trip_repo, locks }
    }

    /// Starts a pending payment attempt for the booking.
    pub async fn create(&self, principal: &Principal, request: PaymentRequest) -> Result<(Payment, Booking)> {
        self.record(principal, request, PaymentStatus::Pending, ATTEMPT_PREFIX).await
    }

    /// Creates and settles a payment in one step.
    pub async fn confirm(&self, principal: &Principal, request: PaymentRequest) -> Result<(Payment, Booking)> {
        self.record(principal, request, PaymentStatus::Success, MOCK_PREFIX).await
    }

    /// Settles a pending payment as successful. Repeating the call on a
    /// successful payment returns the current state unchanged.
    pub async fn mark_success(&self, principal: &Principal, payment_id: Uuid) -> Result<(Payment, Booking)> {
        self.settle(principal, payment_id, Settlement::Success).await
    }

    pub async fn mark_failed(&self, principal: &Principal, payment_id: Uuid) -> Result<(Payment, Booking)> {
        self.settle(principal, payment_id, Settlement::Failed).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Payment> {
        let payment = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        authorize(principal, Resource::Payment { owner: payment.user_id }, Action::View)?;
        Ok(payment)
    }

    pub async fn list_for_booking(&self, principal: &Principal, booking_id: Uuid) -> Result<Vec<Payment>> {
        let booking = self.load_booking(booking_id).await?;
        authorize(principal, Resource::Booking { owner: booking.user_id }, Action::View)?;
        self.repo.list_for_booking(booking_id).await
    }

    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<Payment>> {
        authorize(principal, Resource::AllRecords, Action::View)?;
        self.repo.list_all().await
    }

    async fn load_booking(&self, id: Uuid) -> Result<Booking> {
        self.booking_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    async fn record(
        &self,
        principal: &Principal,
        request: PaymentRequest,
        status: PaymentStatus,
        prefix: &str,
    ) -> Result<(Payment, Booking)> {
        let booking = self.load_booking(request.booking_id).await?;
        authorize(principal, Resource::Booking { owner: booking.user_id }, Action::Pay)?;
        booking.ensure_payable()?;

        let trip = self
            .trip_repo
            .find_by_id(booking.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
        let amount_cents = booking_total(trip.price_cents, booking.seat_count())?;
        match request.amount_cents {
            Some(amount) if amount < 0 => {
                return Err(AppError::Validation("Amount must not be negative".to_string()));
            }
            Some(amount) if amount != amount_cents => {
                return Err(AppError::Validation(format!(
                    "Amount {} does not match booking total {}",
                    amount, amount_cents
                )));
            }
            _ => {}
        }

        let transaction_id = match request.transaction_id.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => t,
            _ => generate_transaction_id(prefix),
        };

        let _guard = self.locks.lock(booking.trip_id).await;
        self.repo
            .create(NewPayment {
                booking_id: booking.id,
                user_id: booking.user_id,
                amount_cents,
                method: request.method,
                status,
                transaction_id,
            })
            .await
    }

    async fn settle(&self, principal: &Principal, payment_id: Uuid, outcome: Settlement) -> Result<(Payment, Booking)> {
        let payment = self
            .repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        authorize(principal, Resource::Payment { owner: payment.user_id }, Action::Pay)?;

        let booking = self.load_booking(payment.booking_id).await?;

        let _guard = self.locks.lock(booking.trip_id).await;
        self.repo.settle(payment_id, outcome).await
    }
}

fn booking_total(price_cents: i64, seats: i32) -> Result<i64> {
    price_cents
        .checked_mul(i64::from(seats))
        .ok_or_else(|| AppError::Validation("Booking total is out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_total() {
        assert_eq!(booking_total(45_000, 3).unwrap(), 135_000);
        assert_eq!(booking_total(0, 4).unwrap(), 0);
        assert!(matches!(booking_total(i64::MAX / 2 + 1, 2), Err(AppError::Validation(_))));
    }
}
