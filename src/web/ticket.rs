use askama::Template;
use qrcode::{render::svg, QrCode};

use crate::{
    domain::TicketView,
    error::{AppError, Result},
};

#[derive(Template)]
#[template(path = "ticket.html")]
struct TicketDocument<'a> {
    booking_id: String,
    issuance_code: &'a str,
    passenger_name: &'a str,
    passenger_email: &'a str,
    origin: &'a str,
    destination: &'a str,
    date: String,
    time: &'a str,
    seats: String,
    booking_status: &'a str,
    payment_status: &'a str,
    issued_at: String,
    qr_svg: String,
}

/// A rendered ticket ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct RenderedTicket {
    pub file_name: String,
    pub html: String,
}

const UNKNOWN: &str = "Unknown";

pub fn render_ticket(view: &TicketView) -> Result<RenderedTicket> {
    let qr_svg = QrCode::new(view.ticket.issuance_code.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to encode QR code: {}", e)))?
        .render::<svg::Color>()
        .min_dimensions(160, 160)
        .build();

    let trip = view.trip.as_ref();
    let user = view.user.as_ref();

    let document = TicketDocument {
        booking_id: view.booking.id.to_string(),
        issuance_code: &view.ticket.issuance_code,
        passenger_name: user.map(|u| u.name.as_str()).unwrap_or(UNKNOWN),
        passenger_email: user.map(|u| u.email.as_str()).unwrap_or(UNKNOWN),
        origin: trip.map(|t| t.origin.as_str()).unwrap_or(UNKNOWN),
        destination: trip.map(|t| t.destination.as_str()).unwrap_or(UNKNOWN),
        date: trip
            .map(|t| t.date.format("%d %b %Y").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        time: trip.map(|t| t.time.as_str()).unwrap_or(UNKNOWN),
        seats: view
            .ticket
            .seats
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        booking_status: view.booking.status.as_str(),
        payment_status: view.booking.payment_status.as_str(),
        issued_at: view.ticket.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        qr_svg,
    };

    let html = document
        .render()
        .map_err(|e| AppError::Internal(format!("Failed to render ticket: {}", e)))?;

    Ok(RenderedTicket {
        file_name: format!("ticket-{}.html", view.booking.id),
        html,
    })
}
