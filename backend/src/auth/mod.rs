pub mod identity;
pub mod jwt;
pub mod middleware;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use helpdesk_shared::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiResult;
use crate::services::audit::{AuditAction, AuditEntryBuilder};
use crate::AppState;
use identity::SignUp;
use middleware::AuthUser;

pub use identity::{IdentityService, SessionEvent};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub unit_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = state
        .identity
        .sign_up(SignUp {
            email: req.email,
            password: req.password,
            name: req.name,
            unit_id: req.unit_id,
        })
        .await?;

    state
        .audit
        .log(AuditEntryBuilder::new(AuditAction::Create, "profile").resource(&user.id))
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let session = state.identity.sign_in(&req.email, &req.password).await?;

    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Login, "session")
                .user(&session.user.id, Some(session.user.email.clone())),
        )
        .await;

    Ok(Json(LoginResponse {
        token: session.token,
        user: session.user,
        expires_at: session.expires_at,
    }))
}

async fn logout(State(state): State<Arc<AppState>>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.identity.sign_out(&auth.session_id).await?;

    state
        .audit
        .log(
            AuditEntryBuilder::new(AuditAction::Logout, "session")
                .user(&auth.user.id, Some(auth.user.email.clone())),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}
