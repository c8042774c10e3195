use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    domain::Role,
    error::{AppError, Result},
};

pub mod policy;
pub mod token;

pub use policy::{authorize, Action, Principal, Resource};
use token::{Claims, TokenService};

pub const TOKEN_COOKIE: &str = "jwt";

pub struct AuthService {
    tokens: TokenService,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt_secret, config.token_duration_hours),
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<String> {
        self.tokens.issue(user_id, role)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }

    pub fn create_token_cookie(&self, token: &str, secure: bool) -> Cookie<'static> {
        let max_age = cookie::time::Duration::seconds(self.tokens.max_age().num_seconds());
        Cookie::build((TOKEN_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(secure)
            .max_age(max_age)
            .build()
    }

    pub fn create_logout_cookie() -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

/// Pulls the bearer token from the `Authorization` header, falling back to
/// the `jwt` cookie.
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        jar.get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|token| !token.is_empty())
    })
}
