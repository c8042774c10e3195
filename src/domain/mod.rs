pub mod user;
pub mod inventory;
pub mod trip;
pub mod booking;
pub mod payment;
pub mod ticket;

pub use user::*;
pub use inventory::*;
pub use trip::*;
pub use booking::*;
pub use payment::*;
pub use ticket::*;
