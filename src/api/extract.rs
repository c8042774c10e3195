use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` body extractor whose rejections go through `AppError`, so a
/// malformed or incomplete body is a 400 with the usual error payload.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
