use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripdesk::{
    api,
    config::Settings,
    db,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripdesk=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    if settings.auth.jwt_secret == Settings::default().auth.jwt_secret {
        tracing::warn!("Using the built-in JWT secret; set TRIPDESK__AUTH__JWT_SECRET");
    }

    tracing::info!("Starting Tripdesk server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database and run migrations
    let db_pool = db::connect(&settings.database).await?;

    tokio::fs::create_dir_all(&settings.server.uploads_dir).await?;

    let service_context = Arc::new(ServiceContext::new(db_pool, &settings));

    service_context
        .user_service
        .ensure_default_admin(&settings.auth)
        .await?;

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
