use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        normalize_seats, Booking, BookingDetails, BookingPaymentStatus, BookingStatus, NewBooking,
        Role, TripSummary, UserSummary,
    },
    error::{is_unique_violation, AppError, Result},
    repository::{
        claim_row, decode_seats, encode_seats, parse_uuid, to_utc,
        trip_repository::{fetch_trip, store_inventory},
        BookingRepository,
    },
};

#[derive(FromRow)]
pub(crate) struct BookingRow {
    id: String,
    user_id: String,
    trip_id: String,
    seats: String,
    status: String,
    payment_status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Booking row joined with the display fields of its trip and passenger.
/// The trip may have been deleted, so every joined column is nullable.
#[derive(FromRow)]
pub(crate) struct BookingDetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    trip_origin: Option<String>,
    trip_destination: Option<String>,
    trip_date: Option<NaiveDate>,
    trip_time: Option<String>,
    trip_price_cents: Option<i64>,
    user_name: Option<String>,
    user_email: Option<String>,
    user_role: Option<String>,
}

const BOOKING_COLUMNS: &str =
    "id, user_id, trip_id, seats, status, payment_status, created_at, updated_at";

pub(crate) const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.trip_id, b.seats, b.status, b.payment_status,
           b.created_at, b.updated_at,
           t.origin AS trip_origin, t.destination AS trip_destination,
           t.trip_date AS trip_date, t.departure_time AS trip_time,
           t.price_cents AS trip_price_cents,
           u.name AS user_name, u.email AS user_email, u.role AS user_role
    FROM bookings b
    LEFT JOIN trips t ON t.id = b.trip_id
    LEFT JOIN users u ON u.id = b.user_id
"#;

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_booking(row: BookingRow) -> Result<Booking> {
    Ok(Booking {
        id: parse_uuid(&row.id)?,
        user_id: parse_uuid(&row.user_id)?,
        trip_id: parse_uuid(&row.trip_id)?,
        seats: decode_seats(&row.seats)?,
        status: BookingStatus::parse(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid booking status: {}", row.status)))?,
        payment_status: BookingPaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            AppError::Database(format!("Invalid payment status: {}", row.payment_status))
        })?,
        created_at: to_utc(row.created_at),
        updated_at: to_utc(row.updated_at),
    })
}

pub(crate) fn row_to_details(row: BookingDetailsRow) -> Result<BookingDetails> {
    let booking = row_to_booking(row.booking)?;

    let trip = match (
        row.trip_origin,
        row.trip_destination,
        row.trip_date,
        row.trip_time,
        row.trip_price_cents,
    ) {
        (Some(origin), Some(destination), Some(date), Some(time), Some(price_cents)) => {
            Some(TripSummary {
                id: booking.trip_id,
                origin,
                destination,
                date,
                time,
                price_cents,
            })
        }
        _ => None,
    };

    let user = match (row.user_name, row.user_email, row.user_role) {
        (Some(name), Some(email), Some(role)) => Some(UserSummary {
            id: booking.user_id,
            name,
            email,
            role: Role::parse(&role)
                .ok_or_else(|| AppError::Database(format!("Invalid role: {}", role)))?,
        }),
        _ => None,
    };

    Ok(BookingDetails { booking, trip, user })
}

/// Loads a booking on an open connection or transaction.
pub(crate) async fn fetch_booking(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Booking>> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {} FROM bookings WHERE id = ?",
        BOOKING_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(row_to_booking).transpose()
}

pub(crate) async fn store_booking_status(conn: &mut SqliteConnection, booking: &Booking) -> Result<()> {
    sqlx::query(
        "UPDATE bookings SET status = ?, payment_status = ?, updated_at = ? WHERE id = ?"
    )
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(Utc::now().naive_utc())
    .bind(booking.id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Seats among `seats` already held by active bookings on the trip.
async fn taken_seats(conn: &mut SqliteConnection, trip_id: Uuid, seats: &[i32]) -> Result<Vec<i32>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT seat_number FROM booking_seats WHERE active = 1 AND trip_id = ",
    );
    query.push_bind(trip_id.to_string());
    query.push(" AND seat_number IN (");
    let mut separated = query.separated(", ");
    for seat in seats {
        separated.push_bind(*seat);
    }
    separated.push_unseparated(") ORDER BY seat_number");

    let taken: Vec<(i32,)> = query.build_query_as().fetch_all(&mut *conn).await?;
    Ok(taken.into_iter().map(|(seat,)| seat).collect())
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "trips", booking.trip_id).await? {
            return Err(AppError::NotFound("Trip not found".to_string()));
        }
        let mut trip = fetch_trip(&mut tx, booking.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

        let seats = normalize_seats(&booking.seats, trip.inventory.total_seats())?;

        let taken = taken_seats(&mut tx, trip.id, &seats).await?;
        if !taken.is_empty() {
            return Err(AppError::SeatConflict(taken));
        }

        trip.inventory.reserve(seats.len() as i32)?;

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, trip_id, seats, status, payment_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(booking.user_id.to_string())
        .bind(trip.id.to_string())
        .bind(encode_seats(&seats)?)
        .bind(BookingStatus::Upcoming.as_str())
        .bind(BookingPaymentStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for seat in &seats {
            sqlx::query(
                "INSERT INTO booking_seats (booking_id, trip_id, seat_number, active) VALUES (?, ?, ?, 1)"
            )
            .bind(id.to_string())
            .bind(trip.id.to_string())
            .bind(seat)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::SeatConflict(vec![*seat])
                } else {
                    AppError::from(e)
                }
            })?;
        }

        store_inventory(&mut tx, trip.id, &trip.inventory).await?;

        let created = fetch_booking(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created booking".to_string())
        })?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %created.id,
            trip_id = %created.trip_id,
            seats = ?created.seats,
            available = trip.inventory.available_seats(),
            "Booking created"
        );

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        fetch_booking(&mut conn, id).await
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<BookingDetails>> {
        let row = sqlx::query_as::<_, BookingDetailsRow>(&format!(
            "{} WHERE b.id = ?",
            BOOKING_DETAILS_SELECT
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_details).transpose()
    }

    async fn cancel(&self, id: Uuid) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "bookings", id).await? {
            return Err(AppError::NotFound("Booking not found".to_string()));
        }
        let mut booking = fetch_booking(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        booking.cancel()?;
        store_booking_status(&mut tx, &booking).await?;

        sqlx::query("UPDATE booking_seats SET active = 0 WHERE booking_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        // A deleted trip has no inventory left to restore.
        if claim_row(&mut tx, "trips", booking.trip_id).await? {
            if let Some(mut trip) = fetch_trip(&mut tx, booking.trip_id).await? {
                trip.inventory.release(booking.seat_count());
                store_inventory(&mut tx, trip.id, &trip.inventory).await?;
            }
        }

        let cancelled = fetch_booking(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve cancelled booking".to_string())
        })?;

        tx.commit().await?;

        tracing::info!(booking_id = %id, seats = ?cancelled.seats, "Booking cancelled");
        Ok(cancelled)
    }

    async fn complete(&self, id: Uuid) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "bookings", id).await? {
            return Err(AppError::NotFound("Booking not found".to_string()));
        }
        let mut booking = fetch_booking(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        booking.complete()?;
        store_booking_status(&mut tx, &booking).await?;

        let completed = fetch_booking(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve completed booking".to_string())
        })?;

        tx.commit().await?;
        Ok(completed)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetailsRow>(&format!(
            "{} WHERE b.user_id = ? ORDER BY b.created_at DESC, b.rowid DESC",
            BOOKING_DETAILS_SELECT
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_details).collect()
    }

    async fn list_all(&self) -> Result<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetailsRow>(&format!(
            "{} ORDER BY b.created_at DESC, b.rowid DESC",
            BOOKING_DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_details).collect()
    }

    async fn list_active_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE trip_id = ? AND status != 'cancelled' ORDER BY created_at ASC",
            BOOKING_COLUMNS
        ))
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_booking).collect()
    }
}
