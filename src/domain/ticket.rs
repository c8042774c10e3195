use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Booking, TripSummary, UserSummary};

/// Confirmation artifact for a paid booking. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seats: Vec<i32>,
    pub issuance_code: String,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn for_booking(booking: &Booking) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id: booking.user_id,
            trip_id: booking.trip_id,
            seats: booking.seats.clone(),
            issuance_code: generate_issuance_code(),
            created_at: Utc::now(),
        }
    }
}

/// Opaque code printed on the ticket, e.g. `TKT-9F2C61D04AB3E517`. It
/// identifies a ticket for humans; it is not a signature.
pub fn generate_issuance_code() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("TKT-{}", hex::encode_upper(bytes))
}

/// Read-only projection combining the ticket with booking, trip and
/// passenger display fields.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub ticket: Ticket,
    pub booking: Booking,
    pub trip: Option<TripSummary>,
    pub user: Option<UserSummary>,
}
