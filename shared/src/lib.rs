use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a fresh opaque identifier for store-assigned records.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Error returned when a wire label does not name any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// Each enum keeps its Portuguese wire label as the canonical spelling and
// accepts the English snake_case name as an alias.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal, $alias:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label, alias = $alias)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label | $alias => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

labelled_enum! {
    /// Permission level. Determines visible navigation and permitted operations.
    Role, "role" {
        Admin => "ADMIN", "admin";
        User => "USER", "user";
    }
}

labelled_enum! {
    /// Ticket lifecycle state. Any state may move to any other.
    TicketStatus, "ticket status" {
        Open => "Aberto", "open";
        InProgress => "Em Andamento", "in_progress";
        Waiting => "Aguardando", "waiting";
        Closed => "Fechado", "closed";
    }
}

labelled_enum! {
    TicketPriority, "ticket priority" {
        Low => "Baixa", "low";
        Medium => "Média", "medium";
        High => "Alta", "high";
        Critical => "Crítica", "critical";
    }
}

labelled_enum! {
    UnitStatus, "unit status" {
        Active => "Ativa", "active";
        Inactive => "Inativa", "inactive";
    }
}

labelled_enum! {
    SectorStatus, "sector status" {
        Active => "Ativo", "active";
        Inactive => "Inativo", "inactive";
    }
}

labelled_enum! {
    AssetStatus, "asset status" {
        Active => "Ativo", "active";
        InUse => "Em Uso", "in_use";
        InStock => "Em Estoque", "in_stock";
        Maintenance => "Manutenção", "maintenance";
        Discarded => "Descartado", "discarded";
    }
}

labelled_enum! {
    ConnectionType, "connection type" {
        AnyDesk => "ANYDESK", "anydesk";
        Rdp => "RDP", "rdp";
        TeamViewer => "TEAMVIEWER", "teamviewer";
        Vnc => "VNC", "vnc";
    }
}

labelled_enum! {
    ConnectionStatus, "connection status" {
        Online => "Online", "online";
        Offline => "Offline", "offline";
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Default for UnitStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for SectorStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for AssetStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Offline
    }
}

impl TicketStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub unit_id: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Organizational site (branch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub responsible: Option<String>,
    pub status: UnitStatus,
}

/// Department within a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    pub responsible: Option<String>,
    pub status: SectorStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub patrimony_id: String,
    pub category: String,
    pub status: AssetStatus,
    pub unit_id: String,
    pub sector_id: Option<String>,
    pub description: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<Decimal>,
    pub warranty_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    pub responsible: Option<String>,
    pub observations: Option<String>,
}

/// Remote-connection entry as exposed to clients. The secret itself is only
/// available through the audited reveal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccess {
    pub id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    pub access_id: String,
    pub unit_id: Option<String>,
    pub status: ConnectionStatus,
    pub has_password: bool,
}

/// Ticket template offered on the request form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonProblem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub requester_id: String,
    pub assignee_id: Option<String>,
    pub unit_id: String,
    pub category: Option<String>,
    pub sector: Option<String>,
    pub equipment_id: Option<String>,
    pub attachment_name: Option<String>,
    pub technician_name: Option<String>,
    pub observations: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every update.
    pub version: i64,
}

impl Ticket {
    pub fn is_visible_to(&self, viewer: &User) -> bool {
        viewer.is_admin() || self.requester_id == viewer.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub waiting: usize,
    pub closed: usize,
    pub critical_open: usize,
}
