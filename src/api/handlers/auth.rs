use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{extract::ApiJson, state::AppState},
    auth::AuthService,
    domain::User,
    error::Result,
    service::Session,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "does not match password"))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn respond(state: &AppState, jar: CookieJar, session: Session) -> (CookieJar, Json<AuthResponse>) {
    let cookie = state
        .service_context
        .auth_service
        .create_token_cookie(&session.token, state.secure_cookies());

    (
        jar.add(cookie),
        Json(AuthResponse {
            token: session.token,
            user: session.user,
        }),
    )
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate()?;

    let session = state
        .service_context
        .user_service
        .signup(req.name.trim(), &req.email, &req.password)
        .await?;

    let (jar, body) = respond(&state, jar, session);
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    req.validate()?;

    let session = state
        .service_context
        .user_service
        .login(&req.email, &req.password)
        .await?;

    Ok(respond(&state, jar, session))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(AuthService::create_logout_cookie()), StatusCode::NO_CONTENT)
}
