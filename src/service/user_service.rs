use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{authorize, Action, AuthService, Principal, Resource},
    config::AuthConfig,
    domain::{CreateUserRequest, Role, UpdateProfileRequest, User},
    error::{AppError, Result},
    repository::UserRepository,
};

/// A signed-in user together with the token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    auth_service: Arc<AuthService>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, auth_service: Arc<AuthService>) -> Self {
        Self { repo, auth_service }
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if self.repo.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = self
            .repo
            .create(CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");

        let token = self.auth_service.issue_token(user.id, user.role)?;
        Ok(Session { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let (user, password_hash) = self
            .repo
            .find_credentials(email)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if !AuthService::verify_password(password, &password_hash).await? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::Unauthenticated);
        }

        let token = self.auth_service.issue_token(user.id, user.role)?;
        Ok(Session { token, user })
    }

    /// Resolves a bearer token to the current user. The role comes from the
    /// stored account, not the token, so demotions apply immediately.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.auth_service.verify_token(token)?;
        let user_id = claims.user_id()?;

        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthenticated)
    }

    pub async fn profile(&self, id: Uuid) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: UpdateProfileRequest,
    ) -> Result<User> {
        if let Some(ref email) = update.email {
            if let Some(existing) = self.repo.find_by_email(email).await? {
                if existing.id != principal.id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
        }

        self.repo.update_profile(principal.id, update).await
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<User>> {
        authorize(principal, Resource::Users, Action::View)?;
        self.repo.list().await
    }

    /// Creates the configured admin account unless a user with that email
    /// already exists. Returns the account when one was created.
    pub async fn ensure_default_admin(&self, config: &AuthConfig) -> Result<Option<User>> {
        if self.repo.find_by_email(&config.default_admin_email).await?.is_some() {
            return Ok(None);
        }

        let admin = self
            .repo
            .create(CreateUserRequest {
                name: config.default_admin_name.clone(),
                email: config.default_admin_email.clone(),
                password: config.default_admin_password.clone(),
                role: Role::Admin,
            })
            .await?;

        tracing::warn!(
            email = %admin.email,
            "Created default admin account; change its password"
        );

        Ok(Some(admin))
    }
}
