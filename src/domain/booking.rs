use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TripSummary, UserSummary};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    /// Sorted, unique seat numbers.
    pub seats: Vec<i32>,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a reservation. A stored booking starts `Upcoming` (seats
/// held, payment pending) and ends in `Cancelled` or `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Upcoming,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Upcoming => "upcoming",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(BookingStatus::Upcoming),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Paid => "paid",
            BookingPaymentStatus::Failed => "failed",
            BookingPaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingPaymentStatus::Pending),
            "paid" => Some(BookingPaymentStatus::Paid),
            "failed" => Some(BookingPaymentStatus::Failed),
            "refunded" => Some(BookingPaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl Booking {
    pub fn seat_count(&self) -> i32 {
        self.seats.len() as i32
    }

    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// Moves the booking to `Cancelled`. A paid booking is relabelled
    /// `Refunded`; no money moves.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status == BookingStatus::Cancelled {
            return Err(AppError::AlreadyCancelled);
        }
        self.status = BookingStatus::Cancelled;
        if self.payment_status == BookingPaymentStatus::Paid {
            self.payment_status = BookingPaymentStatus::Refunded;
        }
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        match self.status {
            BookingStatus::Upcoming => {
                self.status = BookingStatus::Completed;
                Ok(())
            }
            BookingStatus::Cancelled => Err(AppError::AlreadyCancelled),
            BookingStatus::Completed => Err(AppError::Conflict(
                "Booking already completed".to_string(),
            )),
        }
    }

    /// Checks that a payment attempt may start against this booking.
    pub fn ensure_payable(&self) -> Result<()> {
        if self.status == BookingStatus::Cancelled {
            return Err(AppError::AlreadyCancelled);
        }
        if self.payment_status == BookingPaymentStatus::Paid {
            return Err(AppError::AlreadyPaid);
        }
        Ok(())
    }
}

/// Validates requested seat numbers against a trip's capacity and returns
/// them sorted.
pub fn normalize_seats(seats: &[i32], total_seats: i32) -> Result<Vec<i32>> {
    if seats.is_empty() {
        return Err(AppError::Validation(
            "At least one seat must be booked".to_string(),
        ));
    }

    let mut sorted = seats.to_vec();
    sorted.sort_unstable();

    if let Some(bad) = sorted.iter().find(|s| **s < 1 || **s > total_seats) {
        return Err(AppError::Validation(format!(
            "Seat {} does not exist on this trip (1-{})",
            bad, total_seats
        )));
    }

    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(AppError::Validation(
            "Seat numbers must be unique".to_string(),
        ));
    }

    Ok(sorted)
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seats: Vec<i32>,
}

/// A booking with the trip and passenger context attached. The trip is
/// absent when it has been deleted since the booking was made.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub trip: Option<TripSummary>,
    pub user: Option<UserSummary>,
}
