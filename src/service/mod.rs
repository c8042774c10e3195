pub mod booking_service;
pub mod payment_service;
pub mod ticket_service;
pub mod trip_locks;
pub mod trip_service;
pub mod user_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::auth::AuthService;
use crate::config::Settings;
use booking_service::BookingService;
use payment_service::PaymentService;
use ticket_service::TicketService;
use trip_locks::TripLocks;
use trip_service::TripService;
use user_service::UserService;

pub use payment_service::PaymentRequest;
pub use trip_service::TripDraft;
pub use user_service::Session;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub trip_repo: Arc<dyn TripRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub ticket_repo: Arc<dyn TicketRepository>,
    pub auth_service: Arc<AuthService>,
    pub trip_locks: Arc<TripLocks>,
    pub user_service: Arc<UserService>,
    pub trip_service: Arc<TripService>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    pub ticket_service: Arc<TicketService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let trip_repo: Arc<dyn TripRepository> = Arc::new(SqliteTripRepository::new(db_pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> = Arc::new(SqliteBookingRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let ticket_repo: Arc<dyn TicketRepository> = Arc::new(SqliteTicketRepository::new(db_pool.clone()));

        let auth_service = Arc::new(AuthService::new(&settings.auth));
        let trip_locks = Arc::new(TripLocks::new());

        let user_service = Arc::new(UserService::new(user_repo.clone(), auth_service.clone()));
        let trip_service = Arc::new(TripService::new(
            trip_repo.clone(),
            trip_locks.clone(),
            settings.server.uploads_dir.clone(),
        ));
        let booking_service = Arc::new(BookingService::new(booking_repo.clone(), trip_locks.clone()));
        let payment_service = Arc::new(PaymentService::new(
            payment_repo.clone(),
            booking_repo.clone(),
            trip_repo.clone(),
            trip_locks.clone(),
        ));
        let ticket_service = Arc::new(TicketService::new(ticket_repo.clone(), booking_repo.clone()));

        Self {
            user_repo,
            trip_repo,
            booking_repo,
            payment_repo,
            ticket_repo,
            auth_service,
            trip_locks,
            user_service,
            trip_service,
            booking_service,
            payment_service,
            ticket_service,
            db_pool,
        }
    }
}
