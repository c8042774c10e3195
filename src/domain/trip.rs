use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SeatInventory;

#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    /// Departure time as entered by the operator, e.g. "08:30".
    pub time: String,
    #[serde(flatten)]
    pub inventory: SeatInventory,
    pub price_cents: i64,
    pub image: Option<TripImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripImage {
    /// Path relative to the uploads directory, e.g. "trips/<uuid>.jpg".
    pub path: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct NewTrip {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time: String,
    pub inventory: SeatInventory,
    pub price_cents: i64,
    pub image: Option<TripImage>,
}

/// Partial update. Capacity changes go through `SeatInventory::resize`.
#[derive(Debug, Clone, Default)]
pub struct TripChanges {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub total_seats: Option<i32>,
    pub price_cents: Option<i64>,
    pub image: Option<TripImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripSearch {
    #[serde(alias = "from")]
    pub origin: Option<String>,
    #[serde(alias = "to")]
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

/// Trip fields shown next to a booking or ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSummary {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time: String,
    pub price_cents: i64,
}

impl From<&Trip> for TripSummary {
    fn from(trip: &Trip) -> Self {
        Self {
            id: trip.id,
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            date: trip.date,
            time: trip.time.clone(),
            price_cents: trip.price_cents,
        }
    }
}

/// Accepts "HH:MM" with a 24 hour clock.
pub fn validate_departure_time(time: &str) -> bool {
    chrono::NaiveTime::parse_from_str(time, "%H:%M").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_departure_time() {
        assert!(validate_departure_time("08:30"));
        assert!(validate_departure_time("23:59"));
        assert!(!validate_departure_time("24:00"));
        assert!(!validate_departure_time("8.30"));
        assert!(!validate_departure_time(""));
    }

    #[test]
    fn test_trip_serializes_inventory_inline() {
        let trip = Trip {
            id: Uuid::new_v4(),
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            time: "07:15".to_string(),
            inventory: SeatInventory::with_available(40, 12).unwrap(),
            price_cents: 45000,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["total_seats"], 40);
        assert_eq!(json["available_seats"], 12);
        assert_eq!(json["date"], "2026-01-05");
    }
}
