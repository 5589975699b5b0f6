//! Demo data loaded at startup when `SEED_DEMO_DATA` is enabled.

use chrono::{Duration, NaiveDate, Utc};
use helpdesk_shared::{
    Asset, AssetStatus, CommonProblem, ConnectionStatus, ConnectionType, RemoteAccess, Role,
    Sector, SectorStatus, Ticket, TicketPriority, TicketStatus, Unit, UnitStatus, User,
};
use rust_decimal::Decimal;

use crate::error::ApiResult;
use crate::registry::Registry;
use crate::store::{MemoryStore, PgStore, StoreResult};

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "helpdesk123";

pub fn units() -> Vec<Unit> {
    vec![
        Unit {
            id: "1".into(),
            name: "CLINICA NINARE".into(),
            address: Some("Rua das Flores, 123".into()),
            phone: Some("(11) 9999-8888".into()),
            responsible: Some("Dr. Silva".into()),
            status: UnitStatus::Active,
        },
        Unit {
            id: "2".into(),
            name: "CLINICA NINHO".into(),
            address: Some("Av. Paulista, 1000".into()),
            phone: Some("(11) 3333-4444".into()),
            responsible: Some("Dra. Ana".into()),
            status: UnitStatus::Active,
        },
    ]
}

pub fn sectors() -> Vec<Sector> {
    [
        ("s1", "MARKETING", "2"),
        ("s2", "ASSISTENCIA CLINICA", "2"),
        ("s3", "RECEPÇÃO", "2"),
        ("s4", "TERAPEUTA", "2"),
        ("s5", "RH", "1"),
        ("s6", "TI", "1"),
    ]
    .into_iter()
    .map(|(id, name, unit_id)| Sector {
        id: id.into(),
        name: name.into(),
        unit_id: unit_id.into(),
        responsible: None,
        status: SectorStatus::Active,
    })
    .collect()
}

pub fn users() -> Vec<User> {
    vec![
        User {
            id: "u1".into(),
            name: "Admin Silva".into(),
            email: "admin@helpdesk.com".into(),
            role: Role::Admin,
            unit_id: Some("1".into()),
            is_online: false,
        },
        User {
            id: "u2".into(),
            name: "João Usuário".into(),
            email: "joao@empresa.com".into(),
            role: Role::User,
            unit_id: Some("1".into()),
            is_online: false,
        },
        User {
            id: "u3".into(),
            name: "Maria Souza".into(),
            email: "maria@empresa.com".into(),
            role: Role::User,
            unit_id: Some("2".into()),
            is_online: false,
        },
    ]
}

/// Entries with their plaintext secrets; the registry seals them on load
pub fn remote_access() -> Vec<(RemoteAccess, Option<String>)> {
    vec![
        (
            RemoteAccess {
                id: "r1".into(),
                name: "PC Recepção".into(),
                connection_type: ConnectionType::AnyDesk,
                access_id: "123 456 789".into(),
                unit_id: Some("1".into()),
                status: ConnectionStatus::Online,
                has_password: false,
            },
            Some("abc123".into()),
        ),
        (
            RemoteAccess {
                id: "r2".into(),
                name: "Servidor Principal".into(),
                connection_type: ConnectionType::Rdp,
                access_id: "192.168.1.100".into(),
                unit_id: Some("1".into()),
                status: ConnectionStatus::Online,
                has_password: false,
            },
            Some("StrongPassword!".into()),
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn asset(
    id: &str,
    name: &str,
    patrimony_id: &str,
    category: &str,
    unit_id: &str,
    sector_id: &str,
    brand_model: (&str, &str),
    serial_number: &str,
    acquired: (i32, u32, u32),
    value: i64,
) -> Asset {
    Asset {
        id: id.into(),
        name: name.into(),
        patrimony_id: patrimony_id.into(),
        category: category.into(),
        status: AssetStatus::Active,
        unit_id: unit_id.into(),
        sector_id: Some(sector_id.into()),
        description: format!("{} {} {}", category, brand_model.0, brand_model.1),
        brand: Some(brand_model.0.into()),
        model: Some(brand_model.1.into()),
        serial_number: Some(serial_number.into()),
        acquisition_date: NaiveDate::from_ymd_opt(acquired.0, acquired.1, acquired.2),
        value: Some(Decimal::new(value, 0)),
        warranty_date: None,
        invoice_number: None,
        supplier: None,
        responsible: None,
        observations: None,
    }
}

pub fn assets() -> Vec<Asset> {
    vec![
        asset("a1", "PC-001", "PAT-0001", "Computador", "1", "s5", ("Dell", "OptiPlex 3080"), "CN12345", (2023, 1, 15), 3500),
        asset("a2", "NB-001", "PAT-0002", "Notebook", "1", "s5", ("Lenovo", "ThinkPad E14"), "LN54321", (2023, 3, 20), 4200),
        asset("a3", "IMP-001", "PAT-0003", "Impressora", "2", "s3", ("HP", "LaserJet Pro M404"), "HP98765", (2022, 6, 10), 1800),
    ]
}

pub fn problems() -> Vec<CommonProblem> {
    vec![
        CommonProblem {
            id: "p1".into(),
            title: "Impressora sem papel/toner".into(),
            description: "A impressora do setor está sem papel ou sem toner.".into(),
            priority: TicketPriority::Low,
            category: "Hardware".into(),
        },
        CommonProblem {
            id: "p2".into(),
            title: "Sem acesso à Internet".into(),
            description: "O computador não consegue acessar a internet.".into(),
            priority: TicketPriority::High,
            category: "Rede".into(),
        },
        CommonProblem {
            id: "p3".into(),
            title: "Computador Lento".into(),
            description: "O computador está muito lento para abrir programas.".into(),
            priority: TicketPriority::Medium,
            category: "Hardware".into(),
        },
    ]
}

pub fn tickets() -> Vec<Ticket> {
    let now = Utc::now();
    let yesterday = now - Duration::days(1);
    let two_days_ago = now - Duration::days(2);

    vec![
        Ticket {
            id: "t1".into(),
            title: "Erro no ERP".into(),
            description: "Não consigo lançar nota fiscal.".into(),
            status: TicketStatus::Open,
            priority: TicketPriority::High,
            requester_id: "u2".into(),
            assignee_id: None,
            unit_id: "1".into(),
            category: Some("Software".into()),
            sector: Some("RH".into()),
            equipment_id: None,
            attachment_name: None,
            technician_name: None,
            observations: None,
            due_date: None,
            created_at: yesterday,
            updated_at: yesterday,
            version: 1,
        },
        Ticket {
            id: "t2".into(),
            title: "Solicitação de Mouse".into(),
            description: "Mouse parou de funcionar.".into(),
            status: TicketStatus::Closed,
            priority: TicketPriority::Low,
            requester_id: "u3".into(),
            assignee_id: Some("u1".into()),
            unit_id: "2".into(),
            category: Some("Hardware".into()),
            sector: Some("RECEPÇÃO".into()),
            equipment_id: None,
            attachment_name: None,
            technician_name: Some("Admin Silva".into()),
            observations: None,
            due_date: None,
            created_at: two_days_ago,
            updated_at: yesterday,
            version: 2,
        },
    ]
}

/// Fill the in-process registries
pub async fn populate_registry(registry: &Registry) -> ApiResult<()> {
    registry.load_units(units(), sectors()).await;
    registry.load_assets(assets()).await;
    registry.load_remote_access(remote_access()).await?;
    registry.load_problems(problems()).await;
    Ok(())
}

pub async fn seed_memory_store(store: &MemoryStore, password_hash: &str) {
    for user in users() {
        store.import_profile(user, password_hash.to_string()).await;
    }
    store.import_tickets(tickets()).await;
}

/// Insert demo rows that are not there yet; existing rows are left alone.
pub async fn seed_pg_store(store: &PgStore, password_hash: &str) -> StoreResult<()> {
    for user in users() {
        store.import_profile(user, password_hash.to_string()).await?;
    }
    store.import_tickets(tickets()).await?;
    Ok(())
}
