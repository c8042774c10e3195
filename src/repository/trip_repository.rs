use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewTrip, SeatInventory, Trip, TripChanges, TripImage, TripSearch},
    error::{AppError, Result},
    repository::{claim_row, parse_uuid, to_utc, TripRepository},
};

#[derive(FromRow)]
struct TripRow {
    id: String,
    origin: String,
    destination: String,
    trip_date: NaiveDate,
    departure_time: String,
    total_seats: i32,
    available_seats: i32,
    price_cents: i64,
    image_path: Option<String>,
    image_content_type: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const TRIP_COLUMNS: &str = r#"
    id, origin, destination, trip_date, departure_time, total_seats,
    available_seats, price_cents, image_path, image_content_type,
    created_at, updated_at
"#;

pub struct SqliteTripRepository {
    pool: SqlitePool,
}

impl SqliteTripRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_trip(row: TripRow) -> Result<Trip> {
    let image = match (row.image_path, row.image_content_type) {
        (Some(path), Some(content_type)) => Some(TripImage { path, content_type }),
        _ => None,
    };

    Ok(Trip {
        id: parse_uuid(&row.id)?,
        origin: row.origin,
        destination: row.destination,
        date: row.trip_date,
        time: row.departure_time,
        inventory: SeatInventory::from_stored(row.total_seats, row.available_seats)?,
        price_cents: row.price_cents,
        image,
        created_at: to_utc(row.created_at),
        updated_at: to_utc(row.updated_at),
    })
}

/// Loads a trip on an open connection or transaction.
pub(crate) async fn fetch_trip(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Trip>> {
    let row = sqlx::query_as::<_, TripRow>(&format!(
        "SELECT {} FROM trips WHERE id = ?",
        TRIP_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(row_to_trip).transpose()
}

/// Persists the seat counters. The only write path for `available_seats`.
pub(crate) async fn store_inventory(
    conn: &mut SqliteConnection,
    id: Uuid,
    inventory: &SeatInventory,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE trips
        SET total_seats = ?, available_seats = ?, updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(inventory.total_seats())
    .bind(inventory.available_seats())
    .bind(Utc::now().naive_utc())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl TripRepository for SqliteTripRepository {
    async fn create(&self, trip: NewTrip) -> Result<Trip> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let (image_path, image_content_type) = match trip.image {
            Some(image) => (Some(image.path), Some(image.content_type)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO trips (
                id, origin, destination, trip_date, departure_time, total_seats,
                available_seats, price_cents, image_path, image_content_type,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(trip.origin.trim())
        .bind(trip.destination.trim())
        .bind(trip.date)
        .bind(&trip.time)
        .bind(trip.inventory.total_seats())
        .bind(trip.inventory.available_seats())
        .bind(trip.price_cents)
        .bind(image_path)
        .bind(image_content_type)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created trip".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>> {
        let mut conn = self.pool.acquire().await?;
        fetch_trip(&mut conn, id).await
    }

    async fn search(&self, search: &TripSearch) -> Result<Vec<Trip>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM trips WHERE 1 = 1", TRIP_COLUMNS));

        if let Some(origin) = search.origin.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(" AND origin = ").push_bind(origin.to_string()).push(" COLLATE NOCASE");
        }
        if let Some(destination) = search
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query
                .push(" AND destination = ")
                .push_bind(destination.to_string())
                .push(" COLLATE NOCASE");
        }
        if let Some(date) = search.date {
            query.push(" AND trip_date = ").push_bind(date);
        }
        if let Some(min) = search.min_price {
            query.push(" AND price_cents >= ").push_bind(min);
        }
        if let Some(max) = search.max_price {
            query.push(" AND price_cents <= ").push_bind(max);
        }
        query.push(" ORDER BY trip_date ASC, departure_time ASC");

        let rows = query
            .build_query_as::<TripRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_trip).collect()
    }

    async fn update(&self, id: Uuid, changes: TripChanges) -> Result<Trip> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "trips", id).await? {
            return Err(AppError::NotFound("Trip not found".to_string()));
        }
        let mut trip = fetch_trip(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

        if let Some(new_total) = changes.total_seats {
            if new_total != trip.inventory.total_seats() {
                trip.inventory.resize(new_total)?;
                store_inventory(&mut tx, id, &trip.inventory).await?;
            }
        }

        let (image_path, image_content_type) = match changes.image {
            Some(image) => (Some(image.path), Some(image.content_type)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            UPDATE trips
            SET origin = COALESCE(?, origin),
                destination = COALESCE(?, destination),
                trip_date = COALESCE(?, trip_date),
                departure_time = COALESCE(?, departure_time),
                price_cents = COALESCE(?, price_cents),
                image_path = COALESCE(?, image_path),
                image_content_type = COALESCE(?, image_content_type),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(changes.origin.as_deref().map(str::trim))
        .bind(changes.destination.as_deref().map(str::trim))
        .bind(changes.date)
        .bind(changes.time)
        .bind(changes.price_cents)
        .bind(image_path)
        .bind(image_content_type)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        let updated = fetch_trip(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated trip".to_string())
        })?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Trip> {
        let mut tx = self.pool.begin().await?;

        if !claim_row(&mut tx, "trips", id).await? {
            return Err(AppError::NotFound("Trip not found".to_string()));
        }
        let trip = fetch_trip(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

        let (upcoming,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE trip_id = ? AND status = 'upcoming'"
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        if upcoming > 0 {
            return Err(AppError::Conflict(format!(
                "Trip has {} upcoming booking(s); cancel them before deleting",
                upcoming
            )));
        }

        sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(trip)
    }
}
