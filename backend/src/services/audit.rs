use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Oldest entries are dropped past this many
pub const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StatusChange,
    Reveal,
    Export,
    Login,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::StatusChange => "status_change",
            Self::Reveal => "reveal",
            Self::Export => "export",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::Reveal | Self::Delete)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub metadata: Option<JsonValue>,
    pub is_sensitive: bool,
    pub created_at: DateTime<Utc>,
}

/// Builder for creating audit log entries
pub struct AuditEntryBuilder {
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    user_id: Option<String>,
    user_email: Option<String>,
    metadata: Option<JsonValue>,
}

impl AuditEntryBuilder {
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            user_id: None,
            user_email: None,
            metadata: None,
        }
    }

    pub fn user(mut self, id: impl Into<String>, email: Option<String>) -> Self {
        self.user_id = Some(id.into());
        self.user_email = email;
        self
    }

    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn metadata_json(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn build(self) -> AuditEntry {
        AuditEntry {
            is_sensitive: self.action.is_sensitive(),
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            user_id: self.user_id,
            user_email: self.user_email,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

/// Bounded in-memory activity trail. Entries are also emitted as `tracing`
/// events under the `audit` target so they reach the configured log sink.
#[derive(Debug)]
pub struct AuditService {
    entries: RwLock<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl Default for AuditService {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl AuditService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn log(&self, entry: AuditEntryBuilder) {
        let entry = entry.build();
        tracing::info!(
            target: "audit",
            action = entry.action.as_str(),
            resource_type = %entry.resource_type,
            resource_id = ?entry.resource_id,
            user_id = ?entry.user_id,
            sensitive = entry.is_sensitive,
            "audit event"
        );
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Entries for one resource, newest first
    pub async fn resource_history(&self, resource_type: &str, resource_id: &str) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .filter(|e| {
                e.resource_type == resource_type && e.resource_id.as_deref() == Some(resource_id)
            })
            .cloned()
            .collect()
    }

    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }
}
