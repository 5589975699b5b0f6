use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::auth::middleware::AdminUser;
use crate::services::audit::{AuditAction, AuditEntryBuilder};
use crate::services::export;
use crate::services::stats::{self, ReportFilter, TicketReport};
use crate::AppState;

pub fn report_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/summary", get(summary))
        .route("/export.csv", get(export_csv))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(filter): Query<ReportFilter>,
) -> Json<TicketReport> {
    let tickets = state.tickets.snapshot().await;
    Json(stats::report(&tickets, &filter, Utc::now()))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Query(filter): Query<ReportFilter>,
) -> impl IntoResponse {
    let tickets = state.tickets.snapshot().await;
    let selected = stats::filter_tickets(&tickets, &filter, Utc::now());
    let body = export::tickets_csv(selected.iter().copied());

    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Export, "ticket")
                .user(&admin.id, Some(admin.email.clone()))
                .metadata_json(json!({ "rows": selected.len(), "unit_id": filter.unit_id })),
        )
        .await;

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"relatorio.csv\""),
        ],
        body,
    )
}
