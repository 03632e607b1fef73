//! # Time Normalizer
//!
//! The ticket feed sends human-readable timestamps in two layouts. Before a
//! ticket is written every raw field is parsed into its canonical instant.
//! A field that cannot be parsed is logged and left `None`; it never stops
//! the remaining fields or the write itself.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::Ticket;

/// Layout of every timestamp except the closing time.
pub const FEED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Layout of the `closed` field.
pub const CLOSED_FORMAT: &str = "%m/%d/%Y %H:%M";
/// Layout of the date segment in report URLs.
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_with(raw: &str, fmt: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), fmt)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a feed timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_with(raw, FEED_FORMAT)
}

/// Parses a closing timestamp (`MM/DD/YYYY HH:MM`, UTC).
pub fn parse_closed(raw: &str) -> Option<DateTime<Utc>> {
    parse_with(raw, CLOSED_FORMAT)
}

/// Parses a `YYYY-MM-DD` report date into midnight UTC of that day.
pub fn parse_report_date(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, REPORT_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::ValidationError(format!("can't parse date {raw:?}, expected YYYY-MM-DD")))
}

fn normalize_field(field: &str, raw: &str, parse: fn(&str) -> Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        log::debug!("{field}: no value");
        return None;
    }
    let parsed = parse(raw);
    if parsed.is_none() {
        log::warn!("{field}: can't parse {raw:?}");
    }
    parsed
}

/// Fills every canonical instant on `ticket` from its raw text.
pub fn normalize_ticket(ticket: &mut Ticket) {
    ticket.iso_last_modified = normalize_field("Last Modified", &ticket.last_modified, parse_timestamp);
    ticket.iso_closed = normalize_field("Closed", &ticket.closed, parse_closed);
    ticket.iso_opened = normalize_field("Opened", &ticket.opened, parse_timestamp);
    ticket.parent.iso_created = normalize_field("Parent created", &ticket.parent.created, parse_timestamp);

    for entry in &mut ticket.ith {
        entry.iso_date = normalize_field("ITH", &entry.time, parse_timestamp);
    }
    for log_line in &mut ticket.logs {
        log_line.iso_date = normalize_field("Logs", &log_line.date, parse_timestamp);
    }
}
