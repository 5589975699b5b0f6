use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::tests::{
    helpers::{body_json, request},
    TestContext,
};

#[tokio::test]
async fn test_units_are_readable_by_everyone_signed_in() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u3").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/units?search=ninho", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let units = body_json(response).await;
    assert_eq!(units.as_array().unwrap().len(), 1);
    assert_eq!(units[0]["name"], "CLINICA NINHO");
}

#[tokio::test]
async fn test_sectors_filtered_by_unit() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/sectors?unit_id=1", Some(&token), None))
        .await
        .unwrap();

    let sectors = body_json(response).await;
    let names: Vec<&str> = sectors
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"RH"));
    assert!(names.contains(&"TI"));
}

#[tokio::test]
async fn test_unit_lifecycle() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/units",
            Some(&admin),
            Some(json!({ "name": "CLINICA NOVA", "phone": "(11) 2222-1111" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let unit = body_json(response).await;
    assert_eq!(unit["status"], "Ativa");
    let unit_id = unit["id"].as_str().unwrap().to_string();

    let response = ctx
        .app()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/units/{}", unit_id),
            Some(&admin),
            Some(json!({ "name": "CLINICA NOVA", "status": "Inativa" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Inativa");

    let response = ctx
        .app()
        .oneshot(request("DELETE", &format!("/api/v1/units/{}", unit_id), Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unit_with_sectors_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("DELETE", "/api/v1/units/1", Some(&admin), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_requester_cannot_create_units() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/units",
            Some(&token),
            Some(json!({ "name": "CLINICA X" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_requester_sees_equipment_of_own_unit() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u3").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/assets", Some(&token), None))
        .await
        .unwrap();

    let assets = body_json(response).await;
    let assets = assets.as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["id"], "a3");
}

#[tokio::test]
async fn test_duplicate_patrimony_is_a_conflict() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/assets",
            Some(&admin),
            Some(json!({
                "name": "PC-002",
                "patrimony_id": "pat-0001",
                "category": "Computador",
                "unit_id": "1",
                "sector_id": "s6",
                "description": "Estação de trabalho"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_asset_stats() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/assets/stats", Some(&admin), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 3);
}

#[tokio::test]
async fn test_remote_access_hides_and_reveals_password() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/remote-access/r1", Some(&admin), None))
        .await
        .unwrap();
    let entry = body_json(response).await;
    assert_eq!(entry["has_password"], true);
    assert!(entry.get("password").is_none());

    let response = ctx
        .app()
        .oneshot(request("POST", "/api/v1/remote-access/r1/reveal", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["password"], "abc123");

    let response = ctx
        .app()
        .oneshot(request(
            "GET",
            "/api/v1/audit?resource_type=remote_access&resource_id=r1",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    let history = body_json(response).await;
    assert_eq!(history[0]["action"], "reveal");
    assert_eq!(history[0]["is_sensitive"], true);
}

#[tokio::test]
async fn test_remote_access_is_admin_only() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request("POST", "/api/v1/remote-access/r1/reveal", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(ctx.state.audit.recent(10).await.is_empty());
}

#[tokio::test]
async fn test_problem_templates_listed() {
    let ctx = TestContext::new().await;
    let token = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/problems", Some(&token), None))
        .await
        .unwrap();

    let problems = body_json(response).await;
    assert_eq!(problems.as_array().unwrap().len(), 3);
    assert_eq!(problems[1]["priority"], "Alta");
}
