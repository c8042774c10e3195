use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{extract::ApiJson, middleware::auth::CurrentUser, state::AppState},
    domain::{UpdateProfileRequest, User},
    error::Result,
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileBody {
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: usize,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<User>> {
    let user = state.service_context.user_service.profile(current.user.id).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<UpdateProfileBody>,
) -> Result<Json<User>> {
    body.validate()?;

    let user = state
        .service_context
        .user_service
        .update_profile(
            &current.principal(),
            UpdateProfileRequest {
                name: body.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                email: body.email,
            },
        )
        .await?;

    Ok(Json(user))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserListResponse>> {
    let users = state.service_context.user_service.list(&current.principal()).await?;
    let total = users.len();
    Ok(Json(UserListResponse { users, total }))
}
