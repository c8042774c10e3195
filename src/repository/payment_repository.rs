use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Booking, BookingPaymentStatus, BookingStatus, NewPayment, Payment, PaymentMethod,
        PaymentStatus, Settlement,
    },
    error::{is_unique_violation, AppError, Result},
    repository::{
        booking_repository::{fetch_booking, store_booking_status},
        claim_row, parse_uuid, to_utc, PaymentRepository,
    },
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    booking_id: String,
    user_id: String,
    amount_cents: i64,
    method: String,
    status: String,
    transaction_id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str = r#"
    id, booking_id, user_id, amount_cents, method, status, transaction_id,
    created_at, updated_at
"#;

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: parse_uuid(&row.id)?,
            booking_id: parse_uuid(&row.booking_id)?,
            user_id: parse_uuid(&row.user_id)?,
            amount_cents: row.amount_cents,
            method: PaymentMethod::parse(&row.method)
                .ok_or_else(|| AppError::Database(format!("Invalid payment method: {}", row.method)))?,
            status: PaymentStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?,
            transaction_id: row.transaction_id,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

async fn fetch_payment(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM payments WHERE id = ?",
        PAYMENT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(SqlitePaymentRepository::row_to_payment).transpose()
}

async fn require_booking(conn: &mut SqliteConnection, id: Uuid) -> Result<Booking> {
    fetch_booking(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<(Payment, Booking)> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "bookings", payment.booking_id).await? {
            return Err(AppError::NotFound("Booking not found".to_string()));
        }
        let mut booking = require_booking(&mut tx, payment.booking_id).await?;
        booking.ensure_payable()?;

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, user_id, amount_cents, method, status, transaction_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(payment.booking_id.to_string())
        .bind(payment.user_id.to_string())
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Duplicate transaction id".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        if payment.status == PaymentStatus::Success {
            booking.payment_status = BookingPaymentStatus::Paid;
            store_booking_status(&mut tx, &booking).await?;
        }

        let created = fetch_payment(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })?;
        let booking = require_booking(&mut tx, payment.booking_id).await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %created.id,
            booking_id = %booking.id,
            status = created.status.as_str(),
            transaction_id = %created.transaction_id,
            "Payment recorded"
        );

        Ok((created, booking))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payment(&mut conn, id).await
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE booking_id = ? ORDER BY created_at DESC, rowid DESC",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn list_all(&self) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments ORDER BY created_at DESC, rowid DESC",
            PAYMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn settle(&self, id: Uuid, outcome: Settlement) -> Result<(Payment, Booking)> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "payments", id).await? {
            return Err(AppError::NotFound("Payment not found".to_string()));
        }
        let payment = fetch_payment(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
        let mut booking = require_booking(&mut tx, payment.booking_id).await?;

        if !payment.check_settlement(outcome)? {
            // Already settled this way; report the current state unchanged.
            tx.commit().await?;
            return Ok((payment, booking));
        }

        match outcome {
            Settlement::Success => {
                if booking.status == BookingStatus::Cancelled {
                    return Err(AppError::AlreadyCancelled);
                }
                if booking.payment_status == BookingPaymentStatus::Paid {
                    return Err(AppError::AlreadyPaid);
                }
                booking.payment_status = BookingPaymentStatus::Paid;
                store_booking_status(&mut tx, &booking).await?;
            }
            Settlement::Failed => {
                if booking.payment_status == BookingPaymentStatus::Pending {
                    booking.payment_status = BookingPaymentStatus::Failed;
                    store_booking_status(&mut tx, &booking).await?;
                }
            }
        }

        let status = match outcome {
            Settlement::Success => PaymentStatus::Success,
            Settlement::Failed => PaymentStatus::Failed,
        };

        sqlx::query("UPDATE payments SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let settled = fetch_payment(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve settled payment".to_string())
        })?;
        let booking = require_booking(&mut tx, settled.booking_id).await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %settled.id,
            booking_id = %booking.id,
            status = settled.status.as_str(),
            "Payment settled"
        );

        Ok((settled, booking))
    }
}
