#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use tripdesk::{
    auth::Principal,
    config::Settings,
    db,
    domain::{Role, Trip},
    service::{ServiceContext, TripDraft},
};

/// A throwaway database file plus the services wired on top of it.
pub struct TestContext {
    pub ctx: Arc<ServiceContext>,
    pub settings: Settings,
    pub pool: SqlitePool,
    dir: PathBuf,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub async fn setup() -> anyhow::Result<TestContext> {
    let dir = std::env::temp_dir().join(format!("tripdesk-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;

    let mut settings = Settings::default();
    settings.database.url = format!("sqlite://{}", dir.join("test.db").display());
    settings.database.max_connections = 5;
    settings.server.uploads_dir = dir.join("uploads").to_string_lossy().to_string();
    settings.auth.jwt_secret = "test-secret".to_string();

    let pool = db::connect(&settings.database).await?;
    let ctx = Arc::new(ServiceContext::new(pool.clone(), &settings));

    Ok(TestContext { ctx, settings, pool, dir })
}

impl TestContext {
    /// Inserts a user directly, skipping password hashing.
    pub async fn user(&self, name: &str, role: Role) -> anyhow::Result<Principal> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, 'unusable', ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(format!("{}-{}@example.com", name.to_lowercase(), id.simple()))
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Principal { id, role })
    }

    pub async fn admin(&self) -> anyhow::Result<Principal> {
        self.user("Admin", Role::Admin).await
    }

    pub async fn trip(&self, admin: &Principal, total_seats: i32, available_seats: i32) -> anyhow::Result<Trip> {
        let trip = self
            .ctx
            .trip_service
            .create(admin, draft("Pune", "Mumbai", tomorrow(), total_seats, Some(available_seats), 45_000))
            .await?;
        Ok(trip)
    }

    pub async fn available_seats(&self, trip_id: Uuid) -> anyhow::Result<i32> {
        Ok(self.ctx.trip_service.get(trip_id).await?.inventory.available_seats())
    }

    pub fn token_for(&self, principal: &Principal) -> anyhow::Result<String> {
        Ok(self.ctx.auth_service.issue_token(principal.id, principal.role)?)
    }
}

pub fn tomorrow() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

pub fn draft(
    origin: &str,
    destination: &str,
    date: NaiveDate,
    total_seats: i32,
    available_seats: Option<i32>,
    price_cents: i64,
) -> TripDraft {
    TripDraft {
        origin: origin.to_string(),
        destination: destination.to_string(),
        date,
        time: "08:30".to_string(),
        total_seats,
        available_seats,
        price_cents,
        image: None,
    }
}
