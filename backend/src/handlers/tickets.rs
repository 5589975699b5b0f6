use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use helpdesk_shared::{Ticket, TicketStatus};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::services::audit::{AuditAction, AuditEntryBuilder};
use crate::services::tickets::{CreateTicketRequest, TicketQuery, UpdateTicketRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: TicketStatus,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

pub fn ticket_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/:id", get(get_ticket).put(update_ticket).delete(delete_ticket))
        .route("/:id/status", patch(update_status))
}

async fn list_tickets(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<TicketQuery>,
) -> Json<Vec<Ticket>> {
    Json(state.tickets.list(&auth.user, &query).await)
}

async fn create_ticket(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let ticket = state.tickets.create(&auth.user, req).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Create, "ticket")
                .user(&auth.user.id, Some(auth.user.email.clone()))
                .resource(&ticket.id),
        )
        .await;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ticket>> {
    Ok(Json(state.tickets.get(&auth.user, &id).await?))
}

async fn update_ticket(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTicketRequest>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state.tickets.update_fields(&auth.user, &id, req).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Update, "ticket")
                .user(&auth.user.id, Some(auth.user.email.clone()))
                .resource(&id),
        )
        .await;
    Ok(Json(ticket))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusChange>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .update_status(&auth.user, &id, req.status, req.expected_version)
        .await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::StatusChange, "ticket")
                .user(&auth.user.id, Some(auth.user.email.clone()))
                .resource(&id)
                .metadata_json(json!({ "status": ticket.status })),
        )
        .await;
    Ok(Json(ticket))
}

async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    state.tickets.delete(&auth.user, &id, query.confirm).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Delete, "ticket")
                .user(&auth.user.id, Some(auth.user.email.clone()))
                .resource(&id),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
