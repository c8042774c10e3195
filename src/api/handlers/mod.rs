pub mod auth;
pub mod bookings;
pub mod payments;
pub mod root;
pub mod tickets;
pub mod trips;
pub mod users;
