use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use helpdesk_shared::{Sector, Unit};
use std::sync::Arc;

use super::ListQuery;
use crate::auth::middleware::{AdminUser, AuthUser};
use crate::error::ApiResult;
use crate::registry::{SectorInput, UnitInput};
use crate::AppState;

pub fn unit_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

pub fn sector_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_sectors).post(create_sector))
        .route("/:id", get(get_sector).put(update_sector).delete(delete_sector))
}

async fn list_units(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Unit>> {
    Json(state.registry.list_units(query.search.as_deref()).await)
}

async fn get_unit(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Unit>> {
    Ok(Json(state.registry.get_unit(&id).await?))
}

async fn create_unit(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<UnitInput>,
) -> ApiResult<(StatusCode, Json<Unit>)> {
    Ok((StatusCode::CREATED, Json(state.registry.create_unit(input).await?)))
}

async fn update_unit(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(input): Json<UnitInput>,
) -> ApiResult<Json<Unit>> {
    Ok(Json(state.registry.update_unit(&id, input).await?))
}

async fn delete_unit(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.registry.delete_unit(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sectors(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Sector>> {
    Json(
        state
            .registry
            .list_sectors(query.search.as_deref(), query.unit_id.as_deref())
            .await,
    )
}

async fn get_sector(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Sector>> {
    Ok(Json(state.registry.get_sector(&id).await?))
}

async fn create_sector(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<SectorInput>,
) -> ApiResult<(StatusCode, Json<Sector>)> {
    Ok((StatusCode::CREATED, Json(state.registry.create_sector(input).await?)))
}

async fn update_sector(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(input): Json<SectorInput>,
) -> ApiResult<Json<Sector>> {
    Ok(Json(state.registry.update_sector(&id, input).await?))
}

async fn delete_sector(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.registry.delete_sector(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
