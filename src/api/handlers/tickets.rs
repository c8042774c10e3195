use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Ticket, TicketView},
    error::Result,
    web::ticket::render_ticket,
};

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
    pub total: usize,
}

/// Renders the ticket as an HTML attachment.
pub fn ticket_download(view: &TicketView) -> Result<Response> {
    let rendered = render_ticket(view)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", rendered.file_name),
            ),
        ],
        rendered.html,
    )
        .into_response())
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketView>> {
    let view = state
        .service_context
        .ticket_service
        .view(&current.principal(), id)
        .await?;
    Ok(Json(view))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let view = state
        .service_context
        .ticket_service
        .view(&current.principal(), id)
        .await?;
    ticket_download(&view)
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<TicketListResponse>> {
    let tickets = state
        .service_context
        .ticket_service
        .list_all(&current.principal())
        .await?;
    let total = tickets.len();
    Ok(Json(TicketListResponse { tickets, total }))
}
