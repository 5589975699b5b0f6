//! Remote data store interface.
//!
//! The store owns all durable state. It assigns ids and timestamps on
//! insert and bumps `updated_at`/`version` on update; callers never choose
//! them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_shared::{Role, Ticket, TicketPriority, TicketStatus, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: i64, actual: i64 },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row filter for `select_tickets`. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub requester_id: Option<String>,
    pub unit_id: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.requester_id
            .as_ref()
            .map_or(true, |id| &ticket.requester_id == id)
            && self.unit_id.as_ref().map_or(true, |id| &ticket.unit_id == id)
    }
}

/// Insert payload. Status, id, timestamps and version are set by the store.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub requester_id: String,
    pub unit_id: String,
    pub category: Option<String>,
    pub sector: Option<String>,
    pub equipment_id: Option<String>,
    pub attachment_name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<String>,
    pub category: Option<String>,
    pub technician_name: Option<String>,
    pub observations: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Conditional update: fail unless the stored version matches
    pub expected_version: Option<i64>,
}

impl TicketChanges {
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply the changes in place. Timestamp and version are left to the caller.
    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(title) = &self.title {
            ticket.title = title.clone();
        }
        if let Some(description) = &self.description {
            ticket.description = description.clone();
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(assignee_id) = &self.assignee_id {
            ticket.assignee_id = Some(assignee_id.clone());
        }
        if let Some(category) = &self.category {
            ticket.category = Some(category.clone());
        }
        if let Some(technician_name) = &self.technician_name {
            ticket.technician_name = Some(technician_name.clone());
        }
        if let Some(observations) = &self.observations {
            ticket.observations = Some(observations.clone());
        }
        if let Some(due_date) = self.due_date {
            ticket.due_date = Some(due_date);
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub unit_id: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub unit_id: Option<String>,
    pub is_online: Option<bool>,
}

impl ProfileChanges {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(unit_id) = &self.unit_id {
            user.unit_id = Some(unit_id.clone());
        }
        if let Some(is_online) = self.is_online {
            user.is_online = is_online;
        }
    }
}

/// Profile plus the stored password hash, used only by sign-in.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Strictly-later timestamp for an update of a row last touched at `previous`.
pub fn next_update_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>>;
    async fn find_ticket(&self, id: &str) -> StoreResult<Option<Ticket>>;
    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket>;
    async fn update_ticket(&self, id: &str, changes: TicketChanges) -> StoreResult<Ticket>;
    async fn delete_ticket(&self, id: &str) -> StoreResult<()>;

    async fn select_profiles(&self) -> StoreResult<Vec<User>>;
    async fn find_profile(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>>;
    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<User>;
    async fn update_profile(&self, id: &str, changes: ProfileChanges) -> StoreResult<User>;

    async fn health_check(&self) -> bool;
}
