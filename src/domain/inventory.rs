use serde::Serialize;

use crate::error::{AppError, Result};

/// Seat capacity and remaining availability for one trip.
///
/// The counters are private: the only way to change them is through
/// [`reserve`](Self::reserve), [`release`](Self::release) and
/// [`resize`](Self::resize), each of which keeps
/// `0 <= available_seats <= total_seats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatInventory {
    total_seats: i32,
    available_seats: i32,
}

impl SeatInventory {
    /// A fresh trip with every seat available.
    pub fn new(total_seats: i32) -> Result<Self> {
        Self::with_available(total_seats, total_seats)
    }

    pub fn with_available(total_seats: i32, available_seats: i32) -> Result<Self> {
        if total_seats < 1 {
            return Err(AppError::Validation(
                "Total seats must be at least 1".to_string(),
            ));
        }
        if available_seats < 0 || available_seats > total_seats {
            return Err(AppError::Validation(format!(
                "Available seats must be between 0 and {}",
                total_seats
            )));
        }
        Ok(Self { total_seats, available_seats })
    }

    /// Rebuild from stored counters. Stored rows are guarded by a CHECK
    /// constraint, so a mismatch here means the row was written outside
    /// this type.
    pub fn from_stored(total_seats: i32, available_seats: i32) -> Result<Self> {
        Self::with_available(total_seats, available_seats).map_err(|_| {
            AppError::Database(format!(
                "Corrupt seat inventory: {} of {} available",
                available_seats, total_seats
            ))
        })
    }

    pub fn total_seats(&self) -> i32 {
        self.total_seats
    }

    pub fn available_seats(&self) -> i32 {
        self.available_seats
    }

    pub fn booked_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    pub fn reserve(&mut self, count: i32) -> Result<()> {
        if count < 1 {
            return Err(AppError::Validation(
                "Seat count must be positive".to_string(),
            ));
        }
        if self.available_seats < count {
            return Err(AppError::CapacityExceeded {
                requested: count,
                available: self.available_seats,
            });
        }
        self.available_seats -= count;
        Ok(())
    }

    /// Returns seats to the pool. Never raises availability above the
    /// total; overshoot means earlier bookkeeping went wrong and is logged.
    pub fn release(&mut self, count: i32) {
        let restored = self.available_seats.saturating_add(count.max(0));
        if restored > self.total_seats {
            tracing::warn!(
                requested = count,
                available = self.available_seats,
                total = self.total_seats,
                "Seat release overshoots capacity, clamping"
            );
        }
        self.available_seats = restored.min(self.total_seats);
    }

    /// Changes capacity, moving availability by the same delta (floored at
    /// zero). Shrinking below the booked count does not cancel bookings.
    pub fn resize(&mut self, new_total: i32) -> Result<()> {
        if new_total < 1 {
            return Err(AppError::Validation(
                "Total seats must be at least 1".to_string(),
            ));
        }
        let delta = new_total - self.total_seats;
        self.available_seats = (self.available_seats + delta).clamp(0, new_total);
        self.total_seats = new_total;
        Ok(())
    }
}
