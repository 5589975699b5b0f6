use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use helpdesk_shared::{CommonProblem, DashboardStats};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::services::audit::AuditEntry;
use crate::services::stats;
use crate::services::tickets::TicketQuery;
use crate::AppState;

pub mod assets;
pub mod chat;
pub mod remote_access;
pub mod reports;
pub mod tickets;
pub mod units;
pub mod users;

pub use assets::asset_routes;
pub use chat::chat_routes;
pub use remote_access::remote_access_routes;
pub use reports::report_routes;
pub use tickets::ticket_routes;
pub use units::{sector_routes, unit_routes};
pub use users::user_routes;

/// Common list query: free-text search plus an optional unit filter
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub unit_id: Option<String>,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    if state.store.health_check().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "helpdesk-api",
                "websocket_connections": state.ws_manager.connection_count().await,
                "active_sessions": state.identity.active_sessions().await,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy", "service": "helpdesk-api", "store": "unreachable"})),
        )
    }
}

/// Counters over the tickets visible to the caller
pub async fn dashboard_stats(State(state): State<Arc<AppState>>, auth: AuthUser) -> Json<DashboardStats> {
    let visible = state.tickets.list(&auth.user, &TicketQuery::default()).await;
    Json(stats::dashboard_stats(&visible))
}

pub fn problem_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_problems))
}

async fn list_problems(State(state): State<Arc<AppState>>, _auth: AuthUser) -> Json<Vec<CommonProblem>> {
    Json(state.registry.list_problems().await)
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub limit: Option<usize>,
}

/// Recent audit entries, or the history of one resource when both
/// `resource_type` and `resource_id` are given
pub async fn audit_log(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEntry>> {
    let entries = match (query.resource_type.as_deref(), query.resource_id.as_deref()) {
        (Some(resource_type), Some(resource_id)) => {
            state.audit.resource_history(resource_type, resource_id).await
        }
        _ => state.audit.recent(query.limit.unwrap_or(100)).await,
    };
    Json(entries)
}
