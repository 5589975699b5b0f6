use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::seed::DEMO_PASSWORD;
use crate::tests::{
    helpers::{body_json, request},
    TestContext,
};

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_sessions"], 0);
}

#[tokio::test]
async fn test_login_me_logout_flow() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "joao@empresa.com", "password": DEMO_PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["user"]["id"], "u2");
    assert_eq!(login["user"]["role"], "USER");
    let token = login["token"].as_str().unwrap().to_string();

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "joao@empresa.com");

    let response = ctx
        .app()
        .oneshot(request("POST", "/api/v1/auth/logout", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Revoked sessions stop working right away
    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "admin@helpdesk.com", "password": "wrong-password" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_signup_creates_requester() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "carla@empresa.com",
                "password": "segredo123",
                "name": "Carla Dias",
                "unit_id": "2"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["role"], "USER");
    assert_eq!(user["unit_id"], "2");
}

#[tokio::test]
async fn test_signup_rejects_invalid_email() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "email": "not-an-email", "password": "segredo123", "name": "X" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(response).await["details"]["email"].is_array());
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/auth/me", Some("not.a.jwt"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let ctx = TestContext::new().await;
    let requester = ctx.token_for("u2").await;
    let admin = ctx.token_for("u1").await;

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/users", Some(&requester), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app()
        .oneshot(request(
            "PUT",
            "/api/v1/users/u3",
            Some(&admin),
            Some(json!({ "role": "ADMIN" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "ADMIN");

    let response = ctx
        .app()
        .oneshot(request(
            "PUT",
            "/api/v1/users/u3",
            Some(&admin),
            Some(json!({ "unit_id": "99" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_chat_unread_flow() {
    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;
    let requester = ctx.token_for("u2").await;

    let response = ctx
        .app()
        .oneshot(request(
            "POST",
            "/api/v1/chat/messages",
            Some(&admin),
            Some(json!({ "text": "Manutenção programada hoje às 18h" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/chat/unread", Some(&requester), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["unread"], 1);

    let response = ctx
        .app()
        .oneshot(request("POST", "/api/v1/chat/read", Some(&requester), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app()
        .oneshot(request("GET", "/api/v1/chat/unread", Some(&requester), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["unread"], 0);
}

#[tokio::test]
async fn test_role_change_reaches_open_sockets() {
    use crate::services::notifier::{Audience, EventType, Notification};
    use crate::websocket::WsConnection;
    use helpdesk_shared::Role;
    use tokio::sync::broadcast;

    let ctx = TestContext::new().await;
    let admin = ctx.token_for("u1").await;
    let (tx, mut socket) = broadcast::channel(10);
    ctx.state
        .ws_manager
        .add_connection(WsConnection {
            id: uuid::Uuid::new_v4(),
            user_id: "u3".to_string(),
            session_id: "sess-u3".to_string(),
            role: Role::User,
            sender: tx,
        })
        .await;

    let response = ctx
        .app()
        .oneshot(request(
            "PUT",
            "/api/v1/users/u3",
            Some(&admin),
            Some(json!({ "role": "ADMIN" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    ctx.state
        .ws_manager
        .deliver(&Notification::new(
            EventType::TicketCreated,
            Audience::Admins,
            json!({ "id": "t9" }),
        ))
        .await;
    assert_eq!(socket.recv().await.unwrap().payload["id"], "t9");
}
