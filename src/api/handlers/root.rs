use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Tripdesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Bus ticket booking: trip search, seat reservation, payment and tickets",
        "endpoints": {
            "health": "/api/v1/health",
            "auth": "/api/v1/auth",
            "trips": "/api/v1/trips",
            "bookings": "/api/v1/bookings",
            "payments": "/api/v1/payments",
            "tickets": "/api/v1/tickets"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
