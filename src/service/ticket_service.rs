use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{authorize, Action, Principal, Resource},
    domain::{BookingPaymentStatus, Ticket, TicketView},
    error::{AppError, Result},
    repository::{BookingRepository, TicketRepository},
};

pub struct TicketService {
    repo: Arc<dyn TicketRepository>,
    booking_repo: Arc<dyn BookingRepository>,
}

impl TicketService {
    pub fn new(repo: Arc<dyn TicketRepository>, booking_repo: Arc<dyn BookingRepository>) -> Self {
        Self { repo, booking_repo }
    }

    /// Issues the ticket for a paid booking. Succeeds once per booking.
    pub async fn issue(&self, principal: &Principal, booking_id: Uuid) -> Result<Ticket> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        authorize(principal, Resource::Booking { owner: booking.user_id }, Action::Pay)?;

        self.repo.issue(booking_id).await
    }

    /// Returns the booking's ticket, issuing it first if the booking is paid
    /// and has none yet.
    pub async fn ensure_issued(&self, principal: &Principal, booking_id: Uuid) -> Result<Ticket> {
        if let Some(ticket) = self.repo.find_by_booking(booking_id).await? {
            let booking = self
                .booking_repo
                .find_by_id(booking_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
            authorize(principal, Resource::Booking { owner: booking.user_id }, Action::View)?;
            return Ok(ticket);
        }

        match self.issue(principal, booking_id).await {
            Err(AppError::TicketAlreadyIssued) => self
                .repo
                .find_by_booking(booking_id)
                .await?
                .ok_or_else(|| AppError::Database("Issued ticket vanished".to_string())),
            other => other,
        }
    }

    pub async fn view(&self, principal: &Principal, id: Uuid) -> Result<TicketView> {
        let view = self
            .repo
            .find_view(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        authorize(principal, Resource::Ticket { owner: view.ticket.user_id }, Action::View)?;
        Ok(view)
    }

    /// The ticket projection for a booking, for the download endpoint.
    pub async fn view_for_booking(&self, principal: &Principal, booking_id: Uuid) -> Result<TicketView> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        authorize(principal, Resource::Booking { owner: booking.user_id }, Action::View)?;

        let ticket = match self.repo.find_by_booking(booking_id).await? {
            Some(ticket) => ticket,
            None if booking.payment_status == BookingPaymentStatus::Paid => {
                self.ensure_issued(principal, booking_id).await?
            }
            None => return Err(AppError::NotPaid),
        };

        self.view(principal, ticket.id).await
    }

    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<Ticket>> {
        authorize(principal, Resource::AllRecords, Action::View)?;
        self.repo.list_all().await
    }
}
