//! # Report Aggregator
//!
//! Derived, read-only views over a snapshot of the ticket collection.
//! Nothing here touches the store or mutates its input; handlers fetch the
//! snapshot through [`crate::TicketRepo`] and pass it in.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Ticket, TicketSummary, Workload, WorkloadEntry, STATE_CLOSED, STATE_QUEUED};

/// How calendar weeks are numbered for the weekly reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekNumbering {
    /// Weeks start on Sunday. Week 1 begins on the first Sunday of the
    /// year, earlier days fall in week 0 (range 0..=53). The year is the
    /// plain calendar year.
    #[default]
    Sunday,
    /// ISO-8601: weeks start on Monday, week 1 holds the first Thursday,
    /// and the year is the ISO week-based year.
    Iso,
}

impl std::str::FromStr for WeekNumbering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" => Ok(WeekNumbering::Sunday),
            "iso" => Ok(WeekNumbering::Iso),
            other => Err(format!("unknown week numbering {other:?}, expected \"sunday\" or \"iso\"")),
        }
    }
}

/// A `(year, week)` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

/// Which instant places a ticket in a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekBasis {
    Opened,
    Closed,
}

impl WeekBasis {
    fn instant(self, ticket: &Ticket) -> Option<DateTime<Utc>> {
        match self {
            WeekBasis::Opened => ticket.iso_opened,
            WeekBasis::Closed => ticket.iso_closed,
        }
    }
}

pub fn week_of(instant: DateTime<Utc>, numbering: WeekNumbering) -> WeekKey {
    match numbering {
        WeekNumbering::Sunday => {
            let days_from_sunday = instant.weekday().num_days_from_sunday();
            WeekKey {
                year: instant.year(),
                week: (instant.ordinal0() + 7 - days_from_sunday) / 7,
            }
        }
        WeekNumbering::Iso => {
            let iso = instant.iso_week();
            WeekKey { year: iso.year(), week: iso.week() }
        }
    }
}

fn by_opened(mut tickets: Vec<&Ticket>) -> Vec<&Ticket> {
    // Stable: equal instants keep store order.
    tickets.sort_by_key(|t| t.iso_opened);
    tickets
}

/// Tickets that are neither closed nor cancelled.
pub fn active(tickets: &[Ticket]) -> Vec<TicketSummary> {
    by_opened(tickets.iter().filter(|t| t.is_active()).collect())
        .into_iter()
        .map(|t| TicketSummary {
            number: t.number.clone(),
            owner: t.owner.clone(),
            sev: Some(t.sev.clone()),
            state: Some(t.state.clone()),
            abstract_text: Some(t.abstract_text.clone()),
            iso_opened: t.iso_opened,
            iso_last_modified: t.iso_last_modified,
            iso_closed: None,
        })
        .collect()
}

/// Tickets waiting in the queue.
pub fn queued(tickets: &[Ticket]) -> Vec<TicketSummary> {
    by_opened(tickets.iter().filter(|t| t.state == STATE_QUEUED).collect())
        .into_iter()
        .map(|t| TicketSummary {
            number: t.number.clone(),
            owner: t.owner.clone(),
            sev: Some(t.sev.clone()),
            state: Some(t.state.clone()),
            abstract_text: Some(t.abstract_text.clone()),
            iso_opened: None,
            iso_last_modified: t.iso_last_modified,
            iso_closed: None,
        })
        .collect()
}

/// Whether `ticket` was open at `date`: opened on or before it, and either
/// still not closed or closed on or after it.
pub fn in_backlog(ticket: &Ticket, date: DateTime<Utc>) -> bool {
    let opened_by_then = matches!(ticket.iso_opened, Some(opened) if opened <= date);
    let open_at_date = ticket.state != STATE_CLOSED || matches!(ticket.iso_closed, Some(closed) if closed >= date);
    opened_by_then && open_at_date
}

/// Tickets that were open as of `date`.
pub fn backlog_at(tickets: &[Ticket], date: DateTime<Utc>) -> Vec<TicketSummary> {
    by_opened(tickets.iter().filter(|t| in_backlog(t, date)).collect())
        .into_iter()
        .map(|t| TicketSummary {
            number: t.number.clone(),
            owner: t.owner.clone(),
            sev: Some(t.sev.clone()),
            state: Some(t.state.clone()),
            abstract_text: Some(t.abstract_text.clone()),
            iso_opened: t.iso_opened,
            iso_last_modified: None,
            iso_closed: t.iso_closed,
        })
        .collect()
}

/// Tickets opened (or closed) during the `key` week.
/// Tickets without the relevant instant belong to no week.
pub fn weekly_report(
    tickets: &[Ticket],
    basis: WeekBasis,
    key: WeekKey,
    numbering: WeekNumbering,
) -> Vec<TicketSummary> {
    let mut hits: Vec<(DateTime<Utc>, &Ticket)> = tickets
        .iter()
        .filter_map(|t| basis.instant(t).map(|at| (at, t)))
        .filter(|(at, _)| week_of(*at, numbering) == key)
        .collect();
    hits.sort_by_key(|(at, _)| *at);

    hits.into_iter()
        .map(|(_, t)| match basis {
            WeekBasis::Opened => TicketSummary {
                number: t.number.clone(),
                owner: t.owner.clone(),
                state: Some(t.state.clone()),
                iso_opened: t.iso_opened,
                ..Default::default()
            },
            WeekBasis::Closed => TicketSummary {
                number: t.number.clone(),
                owner: t.owner.clone(),
                iso_closed: t.iso_closed,
                ..Default::default()
            },
        })
        .collect()
}

/// Open tickets grouped by owner, owners in name order.
pub fn workload(tickets: &[Ticket]) -> Vec<Workload> {
    let mut groups: BTreeMap<&str, Vec<WorkloadEntry>> = BTreeMap::new();
    for t in tickets.iter().filter(|t| t.is_active()) {
        groups.entry(t.owner.as_str()).or_default().push(WorkloadEntry {
            number: t.number.clone(),
            state: t.state.clone(),
            owner: t.owner.clone(),
        });
    }

    groups
        .into_iter()
        .map(|(owner, tickets)| Workload { owner: owner.to_string(), tickets })
        .collect()
}
