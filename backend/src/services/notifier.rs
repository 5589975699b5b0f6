//! Outbound notifications.
//!
//! Every event goes to an in-process broadcast channel and to the live
//! WebSocket connections whose user is in the event's audience.

use chrono::{DateTime, Utc};
use helpdesk_shared::{ChatMessage, Role, Ticket};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::auth::SessionEvent;
use crate::websocket::WsManager;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TicketCreated,
    TicketUpdated,
    TicketDeleted,
    ChatMessage,
    SessionChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TicketCreated => "ticket_created",
            Self::TicketUpdated => "ticket_updated",
            Self::TicketDeleted => "ticket_deleted",
            Self::ChatMessage => "chat_message",
            Self::SessionChanged => "session_changed",
        }
    }
}

/// Who receives an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Admins,
    /// Administrators plus one specific user (usually the requester)
    AdminsAnd(String),
}

impl Audience {
    pub fn includes(&self, user_id: &str, role: Role) -> bool {
        match self {
            Self::Everyone => true,
            Self::Admins => role == Role::Admin,
            Self::AdminsAnd(id) => role == Role::Admin || id == user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub event_type: EventType,
    pub audience: Audience,
    pub payload: JsonValue,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(event_type: EventType, audience: Audience, payload: JsonValue) -> Self {
        Self {
            event_type,
            audience,
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    events: broadcast::Sender<Notification>,
    ws_manager: Arc<WsManager>,
    delay: Duration,
}

impl Notifier {
    pub fn new(ws_manager: Arc<WsManager>, delay: Duration) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            events,
            ws_manager,
            delay,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    pub async fn publish(&self, notification: Notification) {
        tracing::debug!(
            event_type = notification.event_type.as_str(),
            "publishing notification"
        );
        // No subscribers is not an error
        let _ = self.events.send(notification.clone());
        self.ws_manager.deliver(&notification).await;
    }

    /// New ticket alert with sound. Administrators get it immediately; for a
    /// requester it fires after the configured delay on a detached task.
    pub async fn ticket_created(&self, ticket: &Ticket, immediate: bool) {
        let notification = Notification::new(
            EventType::TicketCreated,
            Audience::AdminsAnd(ticket.requester_id.clone()),
            json!({
                "ticket": ticket,
                "message": format!("Chamado \"{}\" criado com sucesso", ticket.title),
                "play_sound": true,
            }),
        );

        if immediate || self.delay.is_zero() {
            self.publish(notification).await;
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(notifier.delay).await;
            notifier.publish(notification).await;
        });
    }

    pub async fn ticket_updated(&self, ticket: &Ticket) {
        self.publish(Notification::new(
            EventType::TicketUpdated,
            Audience::AdminsAnd(ticket.requester_id.clone()),
            json!({ "ticket": ticket }),
        ))
        .await;
    }

    pub async fn ticket_deleted(&self, ticket: &Ticket) {
        self.publish(Notification::new(
            EventType::TicketDeleted,
            Audience::AdminsAnd(ticket.requester_id.clone()),
            json!({ "id": ticket.id }),
        ))
        .await;
    }

    pub async fn chat_message(&self, message: &ChatMessage) {
        self.publish(Notification::new(
            EventType::ChatMessage,
            Audience::Everyone,
            json!({ "message": message, "play_sound": true }),
        ))
        .await;
    }

    pub async fn session_changed(&self, event: &SessionEvent) {
        self.publish(Notification::new(
            EventType::SessionChanged,
            Audience::AdminsAnd(event.user_id().to_string()),
            json!(event),
        ))
        .await;
    }
}

/// Relay identity session changes onto the notification stream until the
/// identity service goes away.
pub async fn forward_session_events(
    mut events: broadcast::Receiver<SessionEvent>,
    notifier: Notifier,
) {
    loop {
        match events.recv().await {
            Ok(event) => notifier.session_changed(&event).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
