use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use helpdesk_shared::Asset;
use std::sync::Arc;

use super::ListQuery;
use crate::auth::middleware::{AdminUser, AuthUser};
use crate::error::ApiResult;
use crate::registry::AssetInput;
use crate::services::stats::{self, AssetStats};
use crate::AppState;

pub fn asset_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route("/stats", get(asset_stats))
        .route("/:id", get(get_asset).put(update_asset).delete(delete_asset))
}

/// Requesters only see the equipment of one unit (theirs unless another is
/// asked for), which is what the ticket form offers.
async fn list_assets(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Asset>> {
    let unit_id = if auth.user.is_admin() {
        query.unit_id
    } else {
        match query.unit_id.or(auth.user.unit_id) {
            Some(unit_id) => Some(unit_id),
            None => return Json(Vec::new()),
        }
    };

    Json(
        state
            .registry
            .list_assets(query.search.as_deref(), unit_id.as_deref())
            .await,
    )
}

async fn asset_stats(State(state): State<Arc<AppState>>, _admin: AdminUser) -> Json<AssetStats> {
    let assets = state.registry.list_assets(None, None).await;
    Json(stats::asset_stats(&assets))
}

async fn get_asset(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Asset>> {
    Ok(Json(state.registry.get_asset(&id).await?))
}

async fn create_asset(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<AssetInput>,
) -> ApiResult<(StatusCode, Json<Asset>)> {
    Ok((StatusCode::CREATED, Json(state.registry.create_asset(input).await?)))
}

async fn update_asset(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(input): Json<AssetInput>,
) -> ApiResult<Json<Asset>> {
    Ok(Json(state.registry.update_asset(&id, input).await?))
}

async fn delete_asset(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.registry.delete_asset(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
