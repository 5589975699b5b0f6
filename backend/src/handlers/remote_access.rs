use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use helpdesk_shared::RemoteAccess;
use serde::Serialize;
use std::sync::Arc;

use super::ListQuery;
use crate::auth::middleware::AdminUser;
use crate::error::ApiResult;
use crate::registry::RemoteAccessInput;
use crate::services::audit::{AuditAction, AuditEntryBuilder};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RevealedPassword {
    pub id: String,
    pub password: Option<String>,
}

pub fn remote_access_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:id", get(get_entry).put(update_entry).delete(delete_entry))
        .route("/:id/reveal", post(reveal_password))
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<RemoteAccess>> {
    Json(state.registry.list_remote_access(query.search.as_deref()).await)
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<RemoteAccess>> {
    Ok(Json(state.registry.get_remote_access(&id).await?))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(input): Json<RemoteAccessInput>,
) -> ApiResult<(StatusCode, Json<RemoteAccess>)> {
    let entry = state.registry.create_remote_access(input).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Create, "remote_access")
                .user(&admin.id, Some(admin.email.clone()))
                .resource(&entry.id),
        )
        .await;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<RemoteAccessInput>,
) -> ApiResult<Json<RemoteAccess>> {
    let entry = state.registry.update_remote_access(&id, input).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Update, "remote_access")
                .user(&admin.id, Some(admin.email.clone()))
                .resource(&id),
        )
        .await;
    Ok(Json(entry))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.registry.delete_remote_access(&id).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Delete, "remote_access")
                .user(&admin.id, Some(admin.email.clone()))
                .resource(&id),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Decrypt a stored secret. Every reveal is audited.
async fn reveal_password(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<RevealedPassword>> {
    let password = state.registry.reveal_password(&id).await?;
    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Reveal, "remote_access")
                .user(&admin.id, Some(admin.email.clone()))
                .resource(&id),
        )
        .await;
    Ok(Json(RevealedPassword { id, password }))
}
