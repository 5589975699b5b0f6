use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use helpdesk_shared::{Role, User};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::services::notifier::Notification;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl WsMessage {
    fn new(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            payload,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl From<&Notification> for WsMessage {
    fn from(notification: &Notification) -> Self {
        Self {
            event_type: notification.event_type.as_str().to_string(),
            payload: notification.payload.clone(),
            timestamp: notification.timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WsConnection {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub role: Role,
    pub sender: broadcast::Sender<WsMessage>,
}

#[derive(Default)]
pub struct WsManager {
    connections: RwLock<HashMap<Uuid, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_connection(&self, conn: WsConnection) {
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, conn);
    }

    pub async fn remove_connection(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        connections.remove(id);
    }

    /// Fan a notification out to every connection in its audience.
    pub async fn deliver(&self, notification: &Notification) {
        let message = WsMessage::from(notification);
        let connections = self.connections.read().await;
        for conn in connections.values() {
            if notification.audience.includes(&conn.user_id, conn.role) {
                let _ = conn.sender.send(message.clone());
            }
        }
    }

    /// Tell every socket opened with `session_id` that it ended, then drop them.
    /// Dropping the sender closes the channel and ends the socket's send loop.
    pub async fn close_session(&self, session_id: &str) {
        let mut connections = self.connections.write().await;
        let closed: Vec<Uuid> = connections
            .values()
            .filter(|conn| conn.session_id == session_id)
            .map(|conn| conn.id)
            .collect();

        for id in closed {
            if let Some(conn) = connections.remove(&id) {
                let _ = conn.sender.send(WsMessage::new(
                    "session_closed",
                    serde_json::json!({ "connection_id": id }),
                ));
                tracing::info!(user_id = %conn.user_id, connection_id = %id, "websocket session closed");
            }
        }
    }

    /// Apply a role change to the user's open sockets so audience checks follow it.
    pub async fn update_role(&self, user_id: &str, role: Role) {
        let mut connections = self.connections.write().await;
        for conn in connections.values_mut().filter(|conn| conn.user_id == user_id) {
            conn.role = role;
        }
    }

    pub async fn send_to_connection(&self, id: &Uuid, message: WsMessage) {
        let connections = self.connections.read().await;
        if let Some(conn) = connections.get(id) {
            let _ = conn.sender.send(message);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn reject(mut socket: WebSocket, reason: &str) {
    let message = WsMessage::new("error", serde_json::json!({ "message": reason }));
    if let Ok(text) = serde_json::to_string(&message) {
        let _ = socket.send(Message::Text(text)).await;
    }
    let _ = socket.close().await;
}

async fn authenticate(
    state: &AppState,
    token: Option<String>,
) -> Result<(User, String), &'static str> {
    let token = token.ok_or("No authentication token provided")?;
    state
        .identity
        .authenticate(&token)
        .await
        .map_err(|_| "Authentication failed")
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let (user, session_id) = match authenticate(&state, token).await {
        Ok(authenticated) => authenticated,
        Err(reason) => return reject(socket, reason).await,
    };

    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = broadcast::channel(100);

    state
        .ws_manager
        .add_connection(WsConnection {
            id: connection_id,
            user_id: user.id.clone(),
            session_id,
            role: user.role,
            sender: tx,
        })
        .await;
    tracing::info!(user_id = %user.id, %connection_id, "websocket connected");

    state
        .ws_manager
        .send_to_connection(
            &connection_id,
            WsMessage::new(
                "connected",
                serde_json::json!({ "connection_id": connection_id, "user_id": user.id }),
            ),
        )
        .await;

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    let Ok(text) = serde_json::to_string(&msg) else {
                        continue;
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(ws_msg) = serde_json::from_str::<WsMessage>(&text) {
                        handle_client_message(&state_clone, connection_id, ws_msg).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.ws_manager.remove_connection(&connection_id).await;
    tracing::info!(user_id = %user.id, %connection_id, "websocket disconnected");
}

async fn handle_client_message(state: &Arc<AppState>, connection_id: Uuid, message: WsMessage) {
    match message.event_type.as_str() {
        "ping" => {
            state
                .ws_manager
                .send_to_connection(&connection_id, WsMessage::new("pong", serde_json::json!({})))
                .await;
        }
        other => {
            tracing::warn!("Unknown message type: {}", other);
        }
    }
}
