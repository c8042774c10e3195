use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::{extract_token, Principal},
    domain::User,
    error::AppError,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.user)
    }
}

async fn resolve_user(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> Result<User, AppError> {
    let token = extract_token(headers, jar).ok_or(AppError::Unauthenticated)?;
    state.service_context.user_service.authenticate(&token).await
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, request.headers(), &jar).await?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, request.headers(), &jar).await?;

    if !user.is_admin() {
        tracing::debug!(user_id = %user.id, path = %request.uri().path(), "Admin route refused");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}
