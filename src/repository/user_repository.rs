use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    auth::AuthService,
    domain::{CreateUserRequest, Role, UpdateProfileRequest, User},
    error::{is_unique_violation, AppError, Result},
    repository::{parse_uuid, to_utc, UserRepository},
};

// Database row struct that matches SQLite schema
#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            name: row.name,
            email: row.email,
            role: Role::parse(&row.role)
                .ok_or_else(|| AppError::Database(format!("Invalid role: {}", row.role)))?,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let password_hash = AuthService::hash_password(&request.password).await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.name.trim())
        .bind(normalize_email(&request.email))
        .bind(&password_hash)
        .bind(request.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created user".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {}, password_hash FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((Self::row_to_user(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn update_profile(&self, id: Uuid, update: UpdateProfileRequest) -> Result<User> {
        let name = update.name.as_deref().map(str::trim);
        let email = update.email.as_deref().map(normalize_email);
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(name)
        .bind(email)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated user".to_string())
        })
    }
}
