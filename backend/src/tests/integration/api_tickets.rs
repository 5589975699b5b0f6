use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::tests::{
    fixtures::create_ticket_body,
    helpers::{body_bytes, body_json, init_test_logging, request},
    TestContext,
};

#[tokio::test]
async fn test_list_requires_authentication() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/tickets", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requester_lists_only_own_tickets() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u3").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/tickets", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let tickets = body.as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["id"], "t2");
    assert_eq!(tickets[0]["status"], "Fechado");
}

#[tokio::test]
async fn test_create_ticket_endpoint() {
    init_test_logging();
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/tickets",
            Some(&token),
            Some(create_ticket_body("Erro no ERP", "1", "s5")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let ticket = body_json(response).await;
    assert_eq!(ticket["status"], "Aberto");
    assert_eq!(ticket["priority"], "Média");
    assert_eq!(ticket["requester_id"], "u2");
    assert_eq!(ticket["sector"], "RH");

    let snapshot = ctx.state.tickets.snapshot().await;
    assert_eq!(snapshot[0].id, ticket["id"].as_str().unwrap());

    let history = ctx
        .state
        .audit
        .resource_history("ticket", ticket["id"].as_str().unwrap())
        .await;
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_create_without_unit_returns_field_error() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/tickets",
            Some(&token),
            Some(json!({ "title": "Erro no ERP", "description": "Travou", "sector_id": "s5" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["unit_id"][0], "Selecione a Unidade");
}

#[tokio::test]
async fn test_requester_cannot_change_status() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request(
            "PATCH",
            "/api/v1/tickets/t1/status",
            Some(&token),
            Some(json!({ "status": "Fechado" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.state.tickets.snapshot().await[0].status.as_str(), "Aberto");
}

#[tokio::test]
async fn test_admin_changes_status_with_version_check() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request(
            "PATCH",
            "/api/v1/tickets/t1/status",
            Some(&token),
            Some(json!({ "status": "in_progress", "expected_version": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ticket = body_json(response).await;
    assert_eq!(ticket["status"], "Em Andamento");
    assert_eq!(ticket["version"], 2);

    // Same expected version again is now stale
    let response = ctx
        .app()
        .oneshot(request(
            "PATCH",
            "/api/v1/tickets/t1/status",
            Some(&token),
            Some(json!({ "status": "Fechado", "expected_version": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_needs_confirm_flag() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("DELETE", "/api/v1/tickets/t1", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app()
        .oneshot(request("DELETE", "/api/v1/tickets/t1?confirm=true", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/tickets/t1", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_counts_visible_tickets() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;
    let requester = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/dashboard", Some(&admin), None))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["open"], 1);
    assert_eq!(stats["closed"], 1);

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/dashboard", Some(&requester), None))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["open"], 1);
}

#[tokio::test]
async fn test_report_summary_by_unit() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request(
            "GET",
            "/api/v1/reports/summary?period=TODOS&unit_id=2",
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["total"], 1);
    assert_eq!(report["by_status"]["Fechado"], 1);
    assert_eq!(report["by_status"]["Aberto"], 0);
    assert_eq!(report["by_category"]["Hardware"], 1);
}

#[tokio::test]
async fn test_csv_export_is_admin_only() {
    let ctx = TestContext::new().await;
    let requester = ctx.token_for("u2").await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/reports/export.csv", Some(&requester), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app()
        .oneshot(request(
            "GET",
            "/api/v1/reports/export.csv?period=all",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,title,"));
    assert!(lines[1].starts_with("t1,Erro no ERP,"));
}
