//! Ticket lifecycle: creation, visibility-filtered reads, administrator
//! status changes and deletion.
//!
//! The service keeps a most-recent-first copy of the ticket collection.
//! Every mutation goes to the store first; the cached copy changes only
//! after the store call succeeds, so a failure leaves it as it was.

use chrono::{DateTime, Utc};
use helpdesk_shared::{Ticket, TicketPriority, TicketStatus, User};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::middleware::require_admin;
use crate::error::{ApiResult, AppError, ValidationBuilder};
use crate::registry::Registry;
use crate::services::notifier::Notifier;
use crate::store::{DataStore, NewTicket, TicketChanges, TicketFilter};
use crate::validation::{string, Search};

pub const DEFAULT_CATEGORY: &str = "Geral";
const TITLE_MAX: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub unit_id: Option<String>,
    pub sector_id: Option<String>,
    pub equipment_id: Option<String>,
    /// Common-problem template used to pre-fill the request
    pub problem_id: Option<String>,
    pub priority: Option<TicketPriority>,
    pub category: Option<String>,
    pub attachment_name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Quick-create on behalf of another user (administrators only)
    pub requester_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<String>,
    pub category: Option<String>,
    pub technician_name: Option<String>,
    pub observations: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQuery {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub unit_id: Option<String>,
}

pub struct TicketService {
    store: Arc<dyn DataStore>,
    registry: Arc<Registry>,
    notifier: Notifier,
    cache: RwLock<Vec<Ticket>>,
}

impl TicketService {
    pub fn new(store: Arc<dyn DataStore>, registry: Arc<Registry>, notifier: Notifier) -> Self {
        Self {
            store,
            registry,
            notifier,
            cache: RwLock::new(Vec::new()),
        }
    }

    /// Reload the cached collection from the store.
    pub async fn refresh(&self) -> ApiResult<usize> {
        let tickets = self.store.select_tickets(&TicketFilter::default()).await?;
        let count = tickets.len();
        *self.cache.write().await = tickets;
        tracing::info!(count, "ticket cache loaded");
        Ok(count)
    }

    /// Every ticket, most recent first, regardless of viewer
    pub async fn snapshot(&self) -> Vec<Ticket> {
        self.cache.read().await.clone()
    }

    pub async fn create(&self, actor: &User, request: CreateTicketRequest) -> ApiResult<Ticket> {
        let template = match request.problem_id.as_deref() {
            Some(id) => Some(self.registry.get_problem(id).await?),
            None => None,
        };

        let title_input = string::optional(request.title)
            .or_else(|| template.as_ref().map(|t| t.title.clone()));
        let description_input = string::optional(request.description)
            .or_else(|| template.as_ref().map(|t| t.description.clone()));

        let mut errors = ValidationBuilder::new();
        let title = string::required(title_input.as_deref(), "title", "Title is required", &mut errors);
        string::max_length(title.as_deref(), "title", TITLE_MAX, &mut errors);
        let description = string::required(
            description_input.as_deref(),
            "description",
            "Description is required",
            &mut errors,
        );
        let unit_id = string::required(request.unit_id.as_deref(), "unit_id", "Selecione a Unidade", &mut errors);
        let sector_id = string::required(request.sector_id.as_deref(), "sector_id", "Select a sector", &mut errors);

        let equipment_id = string::optional(request.equipment_id);

        let mut sector_name = None;
        if let Some(unit_id) = &unit_id {
            if self.registry.get_unit(unit_id).await.is_err() {
                errors.push("unit_id", "Unit does not exist");
            } else {
                if let Some(sector_id) = &sector_id {
                    match self.registry.get_sector(sector_id).await {
                        Ok(sector) if &sector.unit_id == unit_id => sector_name = Some(sector.name),
                        Ok(_) => errors.push("sector_id", "Sector belongs to a different unit"),
                        Err(_) => errors.push("sector_id", "Sector does not exist"),
                    }
                }
                if let Some(equipment_id) = equipment_id.as_deref() {
                    match self.registry.get_asset(equipment_id).await {
                        Ok(asset) if &asset.unit_id == unit_id => {}
                        Ok(_) => errors.push("equipment_id", "Equipment belongs to a different unit"),
                        Err(_) => errors.push("equipment_id", "Equipment does not exist"),
                    }
                }
            }
        }

        let requester_id = match string::optional(request.requester_id) {
            Some(id) if id != actor.id => {
                require_admin(actor)?;
                if self.store.find_profile(&id).await?.is_none() {
                    errors.push("requester_id", "Requester does not exist");
                }
                id
            }
            _ => actor.id.clone(),
        };
        errors.finish()?;

        let priority = request
            .priority
            .or_else(|| template.as_ref().map(|t| t.priority))
            .unwrap_or_default();
        let category = string::optional(request.category)
            .or_else(|| template.as_ref().map(|t| t.category.clone()))
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let new_ticket = NewTicket {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            status: TicketStatus::Open,
            priority,
            requester_id,
            unit_id: unit_id.unwrap_or_default(),
            category: Some(category),
            sector: sector_name,
            equipment_id,
            attachment_name: string::optional(request.attachment_name),
            due_date: request.due_date,
        };

        let ticket = self.store.insert_ticket(new_ticket).await.map_err(|e| {
            tracing::error!("Failed to create ticket: {}", e);
            AppError::from(e)
        })?;

        self.cache.write().await.insert(0, ticket.clone());
        tracing::info!(
            ticket_id = %ticket.id,
            requester_id = %ticket.requester_id,
            priority = %ticket.priority,
            "ticket created"
        );

        self.notifier.ticket_created(&ticket, actor.is_admin()).await;
        Ok(ticket)
    }

    /// Tickets the viewer may see, most recent first
    pub async fn list(&self, viewer: &User, query: &TicketQuery) -> Vec<Ticket> {
        let search = Search::new(query.search.as_deref());
        self.cache
            .read()
            .await
            .iter()
            .filter(|t| t.is_visible_to(viewer))
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.unit_id.as_ref().map_or(true, |u| &t.unit_id == u))
            .filter(|t| {
                search.matches(
                    [Some(t.title.as_str()), Some(t.description.as_str()), t.category.as_deref(), t.sector.as_deref()]
                        .into_iter()
                        .flatten(),
                )
            })
            .cloned()
            .collect()
    }

    /// A ticket outside the viewer's visibility is reported as missing.
    pub async fn get(&self, viewer: &User, id: &str) -> ApiResult<Ticket> {
        self.cache
            .read()
            .await
            .iter()
            .find(|t| t.id == id && t.is_visible_to(viewer))
            .cloned()
            .ok_or_else(|| AppError::not_found("Ticket"))
    }

    /// Direct status replacement; any state may move to any other.
    pub async fn update_status(
        &self,
        actor: &User,
        id: &str,
        status: TicketStatus,
        expected_version: Option<i64>,
    ) -> ApiResult<Ticket> {
        let mut changes = TicketChanges::status(status);
        changes.expected_version = expected_version;
        self.apply(actor, id, changes).await
    }

    pub async fn update_fields(&self, actor: &User, id: &str, request: UpdateTicketRequest) -> ApiResult<Ticket> {
        require_admin(actor)?;

        let mut errors = ValidationBuilder::new();
        if let Some(title) = request.title.as_deref() {
            string::required(Some(title), "title", "Title cannot be empty", &mut errors);
            string::max_length(Some(title), "title", TITLE_MAX, &mut errors);
        }
        if let Some(description) = request.description.as_deref() {
            string::required(Some(description), "description", "Description cannot be empty", &mut errors);
        }
        let assignee_id = string::optional(request.assignee_id);
        if let Some(assignee_id) = &assignee_id {
            if self.store.find_profile(assignee_id).await?.is_none() {
                errors.push("assignee_id", "Assignee does not exist");
            }
        }
        errors.finish()?;

        let changes = TicketChanges {
            title: request.title.map(|t| t.trim().to_string()),
            description: request.description.map(|d| d.trim().to_string()),
            status: request.status,
            priority: request.priority,
            assignee_id,
            category: string::optional(request.category),
            technician_name: string::optional(request.technician_name),
            observations: request.observations,
            due_date: request.due_date,
            expected_version: request.expected_version,
        };
        self.apply(actor, id, changes).await
    }

    async fn apply(&self, actor: &User, id: &str, changes: TicketChanges) -> ApiResult<Ticket> {
        require_admin(actor)?;

        let updated = self.store.update_ticket(id, changes).await.map_err(|e| {
            tracing::error!(ticket_id = %id, "Failed to update ticket: {}", e);
            AppError::from(e)
        })?;

        {
            let mut cache = self.cache.write().await;
            match cache.iter_mut().find(|t| t.id == updated.id) {
                Some(entry) => *entry = updated.clone(),
                None => {
                    cache.push(updated.clone());
                    cache.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                }
            }
        }
        tracing::info!(ticket_id = %updated.id, status = %updated.status, "ticket updated");

        self.notifier.ticket_updated(&updated).await;
        Ok(updated)
    }

    /// Irreversible. `confirmed` must be set explicitly by the caller.
    pub async fn delete(&self, actor: &User, id: &str, confirmed: bool) -> ApiResult<()> {
        require_admin(actor)?;
        if !confirmed {
            return Err(AppError::bad_request(
                "Deleting a ticket is irreversible; repeat the request with confirm=true",
            ));
        }

        self.store.delete_ticket(id).await.map_err(|e| {
            tracing::error!(ticket_id = %id, "Failed to delete ticket: {}", e);
            AppError::from(e)
        })?;

        let removed = {
            let mut cache = self.cache.write().await;
            let position = cache.iter().position(|t| t.id == id);
            position.map(|i| cache.remove(i))
        };
        tracing::info!(ticket_id = %id, "ticket deleted");

        if let Some(ticket) = removed {
            self.notifier.ticket_deleted(&ticket).await;
        }
        Ok(())
    }
}
