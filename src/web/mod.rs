//! File-backed and rendered content: stored trip images and ticket documents.

pub mod ticket;
pub mod uploads;
