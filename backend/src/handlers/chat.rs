use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use helpdesk_shared::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: usize,
}

pub fn chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", get(list_messages).post(post_message))
        .route("/unread", get(unread_count))
        .route("/read", post(mark_read))
}

async fn list_messages(State(state): State<Arc<AppState>>, auth: AuthUser) -> Json<Vec<ChatMessage>> {
    Json(state.chat.list(&auth.user.id).await)
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<PostMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let participants = state.store.select_profiles().await?;
    let message = state.chat.post(&auth.user, &req.text, &participants).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn unread_count(State(state): State<Arc<AppState>>, auth: AuthUser) -> Json<UnreadCount> {
    Json(UnreadCount {
        unread: state.chat.unread_count(&auth.user.id).await,
    })
}

async fn mark_read(State(state): State<Arc<AppState>>, auth: AuthUser) -> StatusCode {
    state.chat.mark_read(&auth.user.id).await;
    StatusCode::NO_CONTENT
}
