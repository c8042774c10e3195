use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::*;
use crate::error::{AppError, Result};

pub mod user_repository;
pub mod trip_repository;
pub mod booking_repository;
pub mod payment_repository;
pub mod ticket_repository;

pub use user_repository::SqliteUserRepository;
pub use trip_repository::SqliteTripRepository;
pub use booking_repository::SqliteBookingRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use ticket_repository::SqliteTicketRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, request: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// The user and their stored password hash, for login.
    async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn update_profile(&self, id: Uuid, update: UpdateProfileRequest) -> Result<User>;
}

/// Trip catalogue storage. `update` and `delete` run as single
/// transactions; callers hold the trip's guard from `TripLocks`.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create(&self, trip: NewTrip) -> Result<Trip>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>>;
    async fn search(&self, search: &TripSearch) -> Result<Vec<Trip>>;
    async fn update(&self, id: Uuid, changes: TripChanges) -> Result<Trip>;
    /// Fails with `Conflict` while upcoming bookings exist on the trip.
    async fn delete(&self, id: Uuid) -> Result<Trip>;
}

/// Booking storage. Every mutating method is one transaction that also
/// writes the trip's seat inventory; callers hold the trip's guard.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Conflict check, capacity check, insert and reserve, committed together.
    async fn create(&self, booking: NewBooking) -> Result<Booking>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn find_details(&self, id: Uuid) -> Result<Option<BookingDetails>>;
    /// Status flip, seat release and inventory release, committed together.
    async fn cancel(&self, id: Uuid) -> Result<Booking>;
    async fn complete(&self, id: Uuid) -> Result<Booking>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<BookingDetails>>;
    async fn list_all(&self) -> Result<Vec<BookingDetails>>;
    async fn list_active_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts the attempt. A payment created already `Success` marks the
    /// booking paid in the same transaction.
    async fn create(&self, payment: NewPayment) -> Result<(Payment, Booking)>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<Payment>>;
    async fn list_all(&self) -> Result<Vec<Payment>>;
    /// Settles a pending payment and moves the booking's payment status.
    async fn settle(&self, id: Uuid, outcome: Settlement) -> Result<(Payment, Booking)>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Issues the booking's ticket. Fails with `NotPaid` before payment and
    /// `TicketAlreadyIssued` on a second call.
    async fn issue(&self, booking_id: Uuid) -> Result<Ticket>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>>;
    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Ticket>>;
    async fn find_view(&self, id: Uuid) -> Result<Option<TicketView>>;
    async fn list_all(&self) -> Result<Vec<Ticket>>;
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}

pub(crate) fn encode_seats(seats: &[i32]) -> Result<String> {
    serde_json::to_string(seats).map_err(|e| AppError::Internal(e.to_string()))
}

pub(crate) fn decode_seats(s: &str) -> Result<Vec<i32>> {
    serde_json::from_str(s).map_err(|e| AppError::Database(format!("Invalid seats column: {}", e)))
}

/// Opens a transaction's write phase by touching the row. SQLite then
/// holds the database write lock for the rest of the transaction, so later
/// reads see no concurrent writer. Returns false when the row is absent.
pub(crate) async fn claim_row(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: Uuid,
) -> Result<bool> {
    let sql = format!("UPDATE {} SET updated_at = updated_at WHERE id = ?", table);
    let result = sqlx::query(&sql)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
