use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_shared::{new_id, Role, Ticket, TicketPriority, TicketStatus, User};
use sqlx::{FromRow, PgPool};

use super::{
    Credentials, DataStore, NewProfile, NewTicket, ProfileChanges, StoreError, StoreResult,
    TicketChanges, TicketFilter,
};

const TICKET_COLUMNS: &str = "id, title, description, status, priority, requester_id, assignee_id, \
     unit_id, category, sector, equipment_id, attachment_name, technician_name, observations, \
     due_date, created_at, updated_at, version";

const PROFILE_COLUMNS: &str = "id, name, email, role, unit_id, is_online";

#[derive(Debug, FromRow)]
struct TicketRow {
    id: String,
    title: String,
    description: String,
    status: String,
    priority: String,
    requester_id: String,
    assignee_id: Option<String>,
    unit_id: String,
    category: Option<String>,
    sector: Option<String>,
    equipment_id: Option<String>,
    attachment_name: Option<String>,
    technician_name: Option<String>,
    observations: Option<String>,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status: TicketStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("ticket {}: {}", row.id, e)))?;
        let priority: TicketPriority = row
            .priority
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("ticket {}: {}", row.id, e)))?;

        Ok(Ticket {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            priority,
            requester_id: row.requester_id,
            assignee_id: row.assignee_id,
            unit_id: row.unit_id,
            category: row.category,
            sector: row.sector,
            equipment_id: row.equipment_id,
            attachment_name: row.attachment_name,
            technician_name: row.technician_name,
            observations: row.observations,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: String,
    name: String,
    email: String,
    role: String,
    unit_id: Option<String>,
    is_online: bool,
}

impl TryFrom<ProfileRow> for User {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("profile {}: {}", row.id, e)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            unit_id: row.unit_id,
            is_online: row.is_online,
        })
    }
}

#[derive(Debug, FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    password_hash: String,
}

fn map_unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Duplicate(what());
        }
    }
    StoreError::Database(err)
}

/// Postgres-backed store (`profiles` and `tickets` tables).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert rows keeping their ids and timestamps; existing ids are skipped.
    pub async fn import_tickets(&self, tickets: Vec<Ticket>) -> StoreResult<()> {
        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets (id, title, description, status, priority, requester_id, \
                 assignee_id, unit_id, category, sector, equipment_id, attachment_name, \
                 technician_name, observations, due_date, created_at, updated_at, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(&ticket.id)
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(ticket.status.as_str())
            .bind(ticket.priority.as_str())
            .bind(&ticket.requester_id)
            .bind(&ticket.assignee_id)
            .bind(&ticket.unit_id)
            .bind(&ticket.category)
            .bind(&ticket.sector)
            .bind(&ticket.equipment_id)
            .bind(&ticket.attachment_name)
            .bind(&ticket.technician_name)
            .bind(&ticket.observations)
            .bind(ticket.due_date)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .bind(ticket.version)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn import_profile(&self, user: User, password_hash: String) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO profiles (id, name, email, role, unit_id, is_online, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.unit_id)
        .bind(user.is_online)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn current_version(&self, id: &str) -> StoreResult<Option<i64>> {
        let version = sqlx::query_scalar::<_, i64>("SELECT version FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn select_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {} FROM tickets \
             WHERE ($1::TEXT IS NULL OR requester_id = $1) \
               AND ($2::TEXT IS NULL OR unit_id = $2) \
             ORDER BY created_at DESC",
            TICKET_COLUMNS
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(&filter.requester_id)
            .bind(&filter.unit_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn find_ticket(&self, id: &str) -> StoreResult<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS);
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let sql = format!(
            "INSERT INTO tickets (id, title, description, status, priority, requester_id, \
             unit_id, category, sector, equipment_id, attachment_name, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {}",
            TICKET_COLUMNS
        );
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(new_id())
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(ticket.status.as_str())
            .bind(ticket.priority.as_str())
            .bind(&ticket.requester_id)
            .bind(&ticket.unit_id)
            .bind(&ticket.category)
            .bind(&ticket.sector)
            .bind(&ticket.equipment_id)
            .bind(&ticket.attachment_name)
            .bind(ticket.due_date)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn update_ticket(&self, id: &str, changes: TicketChanges) -> StoreResult<Ticket> {
        let sql = format!(
            "UPDATE tickets SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             status = COALESCE($4, status), \
             priority = COALESCE($5, priority), \
             assignee_id = COALESCE($6, assignee_id), \
             category = COALESCE($7, category), \
             technician_name = COALESCE($8, technician_name), \
             observations = COALESCE($9, observations), \
             due_date = COALESCE($10, due_date), \
             updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond'), \
             version = version + 1 \
             WHERE id = $1 AND ($11::BIGINT IS NULL OR version = $11) \
             RETURNING {}",
            TICKET_COLUMNS
        );
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.status.map(|s| s.as_str()))
            .bind(changes.priority.map(|p| p.as_str()))
            .bind(&changes.assignee_id)
            .bind(&changes.category)
            .bind(&changes.technician_name)
            .bind(&changes.observations)
            .bind(changes.due_date)
            .bind(changes.expected_version)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => match (self.current_version(id).await?, changes.expected_version) {
                (Some(actual), Some(expected)) => {
                    Err(StoreError::VersionMismatch { expected, actual })
                }
                _ => Err(StoreError::NotFound {
                    entity: "Ticket",
                    id: id.to_string(),
                }),
            },
        }
    }

    async fn delete_ticket(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Ticket",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn select_profiles(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM profiles ORDER BY name", PROFILE_COLUMNS);
        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_profile(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let sql = format!(
            "SELECT {}, password_hash FROM profiles WHERE LOWER(email) = LOWER($1)",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, CredentialsRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Credentials {
                user: row.profile.try_into()?,
                password_hash: row.password_hash,
            })
        })
        .transpose()
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO profiles (id, name, email, role, unit_id, is_online, password_hash) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) RETURNING {}",
            PROFILE_COLUMNS
        );
        let email = profile.email.clone();
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(profile.id.unwrap_or_else(new_id))
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(profile.role.as_str())
            .bind(&profile.unit_id)
            .bind(&profile.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, || format!("email {} is already registered", email)))?;

        row.try_into()
    }

    async fn update_profile(&self, id: &str, changes: ProfileChanges) -> StoreResult<User> {
        let sql = format!(
            "UPDATE profiles SET \
             name = COALESCE($2, name), \
             role = COALESCE($3, role), \
             unit_id = COALESCE($4, unit_id), \
             is_online = COALESCE($5, is_online) \
             WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(changes.role.map(|r| r.as_str()))
            .bind(&changes.unit_id)
            .bind(changes.is_online)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "User",
                id: id.to_string(),
            })?;

        row.try_into()
    }

    async fn health_check(&self) -> bool {
        crate::database::health_check(&self.pool).await
    }
}
