pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
    web::uploads::MAX_IMAGE_SIZE,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings.clone());

    Router::new()
        .route("/", get(handlers::root::root))
        .nest("/api/v1", api_routes(app_state.clone()))
        // Stored trip images, also reachable through /api/v1/trips/:id/image
        .nest_service("/uploads", ServeDir::new(&settings.server.uploads_dir))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&settings))
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .merge(admin_routes(state))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::root::health_check))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/trips", get(handlers::trips::search))
        .route("/trips/:id", get(handlers::trips::get))
        .route("/trips/:id/image", get(handlers::trips::image))
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(handlers::users::me).patch(handlers::users::update_me))
        // Bookings
        .route("/bookings", post(handlers::bookings::create))
        .route("/bookings/confirm-payment", post(handlers::bookings::confirm_payment))
        .route("/bookings/my", get(handlers::bookings::my_bookings))
        .route("/bookings/:id", get(handlers::bookings::get))
        .route("/bookings/:id/cancel", patch(handlers::bookings::cancel))
        .route("/bookings/:id/ticket", get(handlers::bookings::ticket))
        .route("/bookings/:id/payments", get(handlers::bookings::payments))
        // Payments
        .route("/payments/create", post(handlers::payments::create))
        .route("/payments/confirm", post(handlers::payments::confirm))
        .route("/payments/fail", post(handlers::payments::fail))
        .route("/payments/:id", get(handlers::payments::get))
        // Tickets
        .route("/tickets/:id", get(handlers::tickets::get))
        .route("/tickets/:id/download", get(handlers::tickets::download))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::users::list))
        .route("/trips", post(handlers::trips::create))
        .route(
            "/trips/:id",
            patch(handlers::trips::update).delete(handlers::trips::delete),
        )
        .route("/trips/:id/bookings", get(handlers::trips::bookings))
        .route("/bookings", get(handlers::bookings::list_all))
        .route("/bookings/:id/complete", patch(handlers::bookings::complete))
        .route("/payments", get(handlers::payments::list_all))
        .route("/tickets", get(handlers::tickets::list_all))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
        // Room for a full-size image plus the other form fields.
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
