//! Read-side aggregation. Everything here is recomputed from the given
//! collection on each call; nothing is cached.

use chrono::{DateTime, Duration, Utc};
use helpdesk_shared::{Asset, AssetStatus, DashboardStats, Ticket, TicketPriority, TicketStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reporting window, counted back from now on `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[serde(rename = "DIA", alias = "day")]
    Day,
    #[serde(rename = "SEMANA", alias = "week")]
    Week,
    #[default]
    #[serde(rename = "MÊS", alias = "MONTH", alias = "month")]
    Month,
    #[serde(rename = "TODOS", alias = "ALL", alias = "all")]
    All,
}

impl ReportPeriod {
    pub fn window(&self) -> Option<Duration> {
        match self {
            Self::Day => Some(Duration::days(1)),
            Self::Week => Some(Duration::weeks(1)),
            Self::Month => Some(Duration::days(30)),
            Self::All => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub period: ReportPeriod,
    /// `None` or `"ALL"` covers every unit
    pub unit_id: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        let unit_ok = match self.unit_id.as_deref() {
            None | Some("ALL") | Some("") => true,
            Some(unit_id) => ticket.unit_id == unit_id,
        };
        let period_ok = self
            .period
            .window()
            .map_or(true, |window| ticket.created_at >= now - window);
        unit_ok && period_ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketReport {
    pub period: ReportPeriod,
    pub unit_id: Option<String>,
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_unit: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetStats {
    pub total: usize,
    pub active: usize,
    pub maintenance: usize,
    pub in_stock: usize,
}

pub fn dashboard_stats(tickets: &[Ticket]) -> DashboardStats {
    tickets.iter().fold(DashboardStats::default(), |mut stats, t| {
        stats.total += 1;
        match t.status {
            TicketStatus::Open => stats.open += 1,
            TicketStatus::InProgress => stats.in_progress += 1,
            TicketStatus::Waiting => stats.waiting += 1,
            TicketStatus::Closed => stats.closed += 1,
        }
        if t.priority == TicketPriority::Critical && !t.status.is_closed() {
            stats.critical_open += 1;
        }
        stats
    })
}

/// Tickets selected by a report filter, order preserved
pub fn filter_tickets<'a>(tickets: &'a [Ticket], filter: &ReportFilter, now: DateTime<Utc>) -> Vec<&'a Ticket> {
    tickets.iter().filter(|t| filter.matches(t, now)).collect()
}

pub fn report(tickets: &[Ticket], filter: &ReportFilter, now: DateTime<Utc>) -> TicketReport {
    let selected = filter_tickets(tickets, filter, now);

    // Every status and priority appears, even with a zero count
    let mut by_status: BTreeMap<String, usize> =
        TicketStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    let mut by_priority: BTreeMap<String, usize> =
        TicketPriority::ALL.iter().map(|p| (p.to_string(), 0)).collect();
    let mut by_category = BTreeMap::new();
    let mut by_unit = BTreeMap::new();

    for ticket in &selected {
        *by_status.entry(ticket.status.to_string()).or_default() += 1;
        *by_priority.entry(ticket.priority.to_string()).or_default() += 1;
        let category = ticket
            .category
            .clone()
            .unwrap_or_else(|| super::tickets::DEFAULT_CATEGORY.to_string());
        *by_category.entry(category).or_default() += 1;
        *by_unit.entry(ticket.unit_id.clone()).or_default() += 1;
    }

    TicketReport {
        period: filter.period,
        unit_id: filter.unit_id.clone(),
        total: selected.len(),
        by_status,
        by_priority,
        by_category,
        by_unit,
    }
}

pub fn asset_stats(assets: &[Asset]) -> AssetStats {
    AssetStats {
        total: assets.len(),
        active: assets.iter().filter(|a| a.status == AssetStatus::Active).count(),
        maintenance: assets.iter().filter(|a| a.status == AssetStatus::Maintenance).count(),
        in_stock: assets.iter().filter(|a| a.status == AssetStatus::InStock).count(),
    }
}
