use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use helpdesk_shared::{Role, User};
use serde::Deserialize;
use std::sync::Arc;

use super::ListQuery;
use crate::auth::middleware::AdminUser;
use crate::error::{ApiResult, AppError, ValidationBuilder};
use crate::store::ProfileChanges;
use crate::validation::{string, Search};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub unit_id: Option<String>,
}

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user))
}

/// Search matches name or email
async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let search = Search::new(query.search.as_deref());
    let users = state
        .store
        .select_profiles()
        .await?
        .into_iter()
        .filter(|u| search.matches([u.name.as_str(), u.email.as_str()]))
        .filter(|u| {
            query
                .unit_id
                .as_ref()
                .map_or(true, |id| u.unit_id.as_ref() == Some(id))
        })
        .collect();
    Ok(Json(users))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    state
        .store
        .find_profile(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("User"))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let mut errors = ValidationBuilder::new();
    if let Some(name) = req.name.as_deref() {
        string::required(Some(name), "name", "Name cannot be empty", &mut errors);
    }
    let unit_id = string::optional(req.unit_id);
    if let Some(unit_id) = &unit_id {
        if state.registry.get_unit(unit_id).await.is_err() {
            errors.push("unit_id", "Unit does not exist");
        }
    }
    errors.finish()?;

    let user = state
        .store
        .update_profile(
            &id,
            ProfileChanges {
                name: req.name.map(|n| n.trim().to_string()),
                role: req.role,
                unit_id,
                is_online: None,
            },
        )
        .await?;
    state.ws_manager.update_role(&user.id, user.role).await;
    tracing::info!(user_id = %user.id, role = %user.role, "profile updated");
    Ok(Json(user))
}
