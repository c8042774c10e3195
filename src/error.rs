use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Seats already booked: {}", format_seats(.0))]
    SeatConflict(Vec<i32>),

    #[error("Not enough available seats: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("Booking already paid")]
    AlreadyPaid,

    #[error("Booking already cancelled")]
    AlreadyCancelled,

    #[error("Booking has not been paid")]
    NotPaid,

    #[error("Ticket already issued for this booking")]
    TicketAlreadyIssued,

    #[error("Conflict: {0}")]
    Conflict(String),
}

fn format_seats(seats: &[i32]) -> String {
    seats
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SeatConflict(_)
            | AppError::CapacityExceeded { .. }
            | AppError::AlreadyPaid
            | AppError::AlreadyCancelled
            | AppError::NotPaid
            | AppError::TicketAlreadyIssued
            | AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Stable machine-readable identifier sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::SeatConflict(_) => "seat_conflict",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::AlreadyPaid => "already_paid",
            AppError::AlreadyCancelled => "already_cancelled",
            AppError::NotPaid => "not_paid",
            AppError::TicketAlreadyIssued => "ticket_already_issued",
            AppError::Conflict(_) => "conflict",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                "Database error occurred".to_string()
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Validation(ref msg) | AppError::NotFound(ref msg) | AppError::Conflict(ref msg) => {
                msg.clone()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, detail)
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join("; "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Rejected token: {}", err);
        AppError::Unauthenticated
    }
}

/// True when a database error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_conflicts_map_to_409() {
        assert_eq!(AppError::SeatConflict(vec![3]).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::CapacityExceeded { requested: 2, available: 1 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::AlreadyPaid.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyCancelled.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_seat_conflict_message_lists_seats() {
        let err = AppError::SeatConflict(vec![3, 4]);
        assert_eq!(err.to_string(), "Seats already booked: 3, 4");
        assert_eq!(err.code(), "seat_conflict");
    }
}
