use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{BookingPaymentStatus, Ticket, TicketView},
    error::{is_unique_violation, AppError, Result},
    repository::{
        booking_repository::{fetch_booking, row_to_details, BookingDetailsRow, BOOKING_DETAILS_SELECT},
        claim_row, decode_seats, encode_seats, parse_uuid, to_utc, TicketRepository,
    },
};

#[derive(FromRow)]
struct TicketRow {
    id: String,
    booking_id: String,
    user_id: String,
    trip_id: String,
    seats: String,
    issuance_code: String,
    created_at: NaiveDateTime,
}

const TICKET_COLUMNS: &str = "id, booking_id, user_id, trip_id, seats, issuance_code, created_at";

pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_ticket(row: TicketRow) -> Result<Ticket> {
        Ok(Ticket {
            id: parse_uuid(&row.id)?,
            booking_id: parse_uuid(&row.booking_id)?,
            user_id: parse_uuid(&row.user_id)?,
            trip_id: parse_uuid(&row.trip_id)?,
            seats: decode_seats(&row.seats)?,
            issuance_code: row.issuance_code,
            created_at: to_utc(row.created_at),
        })
    }
}

async fn fetch_ticket(conn: &mut SqliteConnection, column: &'static str, id: Uuid) -> Result<Option<Ticket>> {
    let row = sqlx::query_as::<_, TicketRow>(&format!(
        "SELECT {} FROM tickets WHERE {} = ?",
        TICKET_COLUMNS, column
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(SqliteTicketRepository::row_to_ticket).transpose()
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn issue(&self, booking_id: Uuid) -> Result<Ticket> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "bookings", booking_id).await? {
            return Err(AppError::NotFound("Booking not found".to_string()));
        }
        let booking = fetch_booking(&mut tx, booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.payment_status != BookingPaymentStatus::Paid {
            return Err(AppError::NotPaid);
        }

        let ticket = Ticket::for_booking(&booking);

        sqlx::query(
            r#"
            INSERT INTO tickets (id, booking_id, user_id, trip_id, seats, issuance_code, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(ticket.id.to_string())
        .bind(ticket.booking_id.to_string())
        .bind(ticket.user_id.to_string())
        .bind(ticket.trip_id.to_string())
        .bind(encode_seats(&ticket.seats)?)
        .bind(&ticket.issuance_code)
        .bind(ticket.created_at.naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::TicketAlreadyIssued
            } else {
                AppError::from(e)
            }
        })?;

        let issued = fetch_ticket(&mut tx, "id", ticket.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve issued ticket".to_string())
        })?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %issued.id,
            booking_id = %issued.booking_id,
            code = %issued.issuance_code,
            "Ticket issued"
        );

        Ok(issued)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        let mut conn = self.pool.acquire().await?;
        fetch_ticket(&mut conn, "id", id).await
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Ticket>> {
        let mut conn = self.pool.acquire().await?;
        fetch_ticket(&mut conn, "booking_id", booking_id).await
    }

    async fn find_view(&self, id: Uuid) -> Result<Option<TicketView>> {
        let mut conn = self.pool.acquire().await?;

        let Some(ticket) = fetch_ticket(&mut conn, "id", id).await? else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, BookingDetailsRow>(&format!(
            "{} WHERE b.id = ?",
            BOOKING_DETAILS_SELECT
        ))
        .bind(ticket.booking_id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::Database("Ticket references a missing booking".to_string()))?;

        let details = row_to_details(row)?;

        Ok(Some(TicketView {
            ticket,
            booking: details.booking,
            trip: details.trip,
            user: details.user,
        }))
    }

    async fn list_all(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets ORDER BY created_at DESC, rowid DESC",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_ticket).collect()
    }
}
