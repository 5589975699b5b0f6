use async_trait::async_trait;
use chrono::Utc;
use helpdesk_shared::{new_id, Ticket, User};
use tokio::sync::RwLock;

use super::{
    next_update_time, Credentials, DataStore, NewProfile, NewTicket, ProfileChanges, StoreError,
    StoreResult, TicketChanges, TicketFilter,
};

#[derive(Debug, Clone)]
struct ProfileRecord {
    user: User,
    password_hash: String,
}

/// Process-local store used when no `DATABASE_URL` is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: RwLock<Vec<Ticket>>,
    profiles: RwLock<Vec<ProfileRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows as-is, keeping their ids and timestamps.
    pub async fn import_tickets(&self, tickets: Vec<Ticket>) {
        self.tickets.write().await.extend(tickets);
    }

    pub async fn import_profile(&self, user: User, password_hash: String) {
        self.profiles
            .write()
            .await
            .push(ProfileRecord { user, password_hash });
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut selected: Vec<Ticket> = tickets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(selected)
    }

    async fn find_ticket(&self, id: &str) -> StoreResult<Option<Ticket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let now = Utc::now();
        let row = Ticket {
            id: new_id(),
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            requester_id: ticket.requester_id,
            assignee_id: None,
            unit_id: ticket.unit_id,
            category: ticket.category,
            sector: ticket.sector,
            equipment_id: ticket.equipment_id,
            attachment_name: ticket.attachment_name,
            technician_name: None,
            observations: None,
            due_date: ticket.due_date,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        self.tickets.write().await.push(row.clone());
        Ok(row)
    }

    async fn update_ticket(&self, id: &str, changes: TicketChanges) -> StoreResult<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Ticket",
                id: id.to_string(),
            })?;

        if let Some(expected) = changes.expected_version {
            if expected != ticket.version {
                return Err(StoreError::VersionMismatch {
                    expected,
                    actual: ticket.version,
                });
            }
        }

        changes.apply_to(ticket);
        ticket.updated_at = next_update_time(ticket.updated_at);
        ticket.version += 1;
        Ok(ticket.clone())
    }

    async fn delete_ticket(&self, id: &str) -> StoreResult<()> {
        let mut tickets = self.tickets.write().await;
        let before = tickets.len();
        tickets.retain(|t| t.id != id);
        if tickets.len() == before {
            return Err(StoreError::NotFound {
                entity: "Ticket",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn select_profiles(&self) -> StoreResult<Vec<User>> {
        let profiles = self.profiles.read().await;
        let mut users: Vec<User> = profiles.iter().map(|p| p.user.clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn find_profile(&self, id: &str) -> StoreResult<Option<User>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.user.id == id).map(|p| p.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .iter()
            .find(|p| p.user.email.eq_ignore_ascii_case(email))
            .map(|p| Credentials {
                user: p.user.clone(),
                password_hash: p.password_hash.clone(),
            }))
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<User> {
        let mut profiles = self.profiles.write().await;
        if profiles
            .iter()
            .any(|p| p.user.email.eq_ignore_ascii_case(&profile.email))
        {
            return Err(StoreError::Duplicate(format!(
                "email {} is already registered",
                profile.email
            )));
        }

        let user = User {
            id: profile.id.unwrap_or_else(new_id),
            name: profile.name,
            email: profile.email,
            role: profile.role,
            unit_id: profile.unit_id,
            is_online: false,
        };
        profiles.push(ProfileRecord {
            user: user.clone(),
            password_hash: profile.password_hash,
        });
        Ok(user)
    }

    async fn update_profile(&self, id: &str, changes: ProfileChanges) -> StoreResult<User> {
        let mut profiles = self.profiles.write().await;
        let record = profiles
            .iter_mut()
            .find(|p| p.user.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "User",
                id: id.to_string(),
            })?;
        changes.apply_to(&mut record.user);
        Ok(record.user.clone())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
