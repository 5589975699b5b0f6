//! Support chat between requesters and administrators.
//!
//! Messages live in process memory only and are lost on restart.

use chrono::Utc;
use helpdesk_shared::{new_id, ChatMessage, User};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{ApiResult, ValidationBuilder};
use crate::services::notifier::Notifier;
use crate::validation::string;

const MESSAGE_MAX: usize = 2000;

pub struct ChatService {
    messages: RwLock<Vec<ChatMessage>>,
    unread: RwLock<HashMap<String, usize>>,
    /// Per user: how many messages existed at their last `mark_read`
    read_upto: RwLock<HashMap<String, usize>>,
    notifier: Notifier,
}

impl ChatService {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            unread: RwLock::new(HashMap::new()),
            read_upto: RwLock::new(HashMap::new()),
            notifier,
        }
    }

    /// Append a message and mark it unread for every other participant.
    pub async fn post(&self, sender: &User, text: &str, participants: &[User]) -> ApiResult<ChatMessage> {
        let mut errors = ValidationBuilder::new();
        let text = string::required(Some(text), "text", "Message cannot be empty", &mut errors);
        string::max_length(text.as_deref(), "text", MESSAGE_MAX, &mut errors);
        errors.finish()?;

        let message = ChatMessage {
            id: new_id(),
            sender_id: sender.id.clone(),
            text: text.unwrap_or_default(),
            timestamp: Utc::now(),
            read: false,
        };

        self.messages.write().await.push(message.clone());
        {
            let mut unread = self.unread.write().await;
            for user in participants.iter().filter(|u| u.id != sender.id) {
                *unread.entry(user.id.clone()).or_default() += 1;
            }
        }
        tracing::debug!(sender_id = %sender.id, "chat message posted");

        self.notifier.chat_message(&message).await;
        Ok(message)
    }

    /// Messages in posting order as `viewer_id` sees them. `read` is set on
    /// the viewer's own messages and on everything before their last `mark_read`.
    pub async fn list(&self, viewer_id: &str) -> Vec<ChatMessage> {
        let read_upto = self.read_upto.read().await.get(viewer_id).copied().unwrap_or(0);
        self.messages
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(position, message)| ChatMessage {
                read: message.sender_id == viewer_id || position < read_upto,
                ..message.clone()
            })
            .collect()
    }

    pub async fn unread_count(&self, user_id: &str) -> usize {
        self.unread.read().await.get(user_id).copied().unwrap_or(0)
    }

    /// Clear the user's unread counter. Other users' read state is untouched.
    pub async fn mark_read(&self, user_id: &str) {
        let seen = self.messages.read().await.len();
        self.unread.write().await.remove(user_id);
        self.read_upto.write().await.insert(user_id.to_string(), seen);
    }
}
