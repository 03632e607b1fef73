//! # Domain Models
//!
//! These structs represent the records kept by the ticket service.
//! Raw timestamps arrive as text; each one is paired with an optional
//! canonical instant filled in by [`crate::normalize`].
//! Field names on the wire follow the ticket feed's JSON, hence the renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATE_CLOSED: &str = "Closed";
pub const STATE_CANCEL: &str = "Cancel";
pub const STATE_QUEUED: &str = "Queued";

/// One entry in a ticket's status history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusHistoryEntry {
    pub state: String,
    pub time: String,
    #[serde(rename = "isodate")]
    pub iso_date: Option<DateTime<Utc>>,
    #[serde(rename = "modifiedby")]
    pub modified_by: String,
    pub activity: String,
}

/// A free-text worklog line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketLog {
    pub date: String,
    #[serde(rename = "isodate")]
    pub iso_date: Option<DateTime<Utc>>,
    pub info: String,
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketParent {
    pub status: String,
    pub sev: String,
    pub number: String,
    pub created: String,
    // Misspelled on the wire since the first version of the feed.
    #[serde(rename = "isocreted")]
    pub iso_created: Option<DateTime<Utc>>,
}

/// A ticket as submitted by the feed. `number` is the natural key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ticket {
    pub sev: String,
    pub subroot_cause: String,
    pub opened: String,
    #[serde(rename = "isoopened")]
    pub iso_opened: Option<DateTime<Utc>>,
    pub parent: TicketParent,
    pub handover: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub number: String,
    #[serde(rename = "lastmodifiedby")]
    pub last_modified_by: String,
    pub state: String,
    #[serde(rename = "lastmodified")]
    pub last_modified: String,
    #[serde(rename = "isolastmodified")]
    pub iso_last_modified: Option<DateTime<Utc>>,
    pub role: String,
    pub dispatch: String,
    #[serde(rename = "isoclosed")]
    pub iso_closed: Option<DateTime<Utc>>,
    pub closed: String,
    pub owner: String,
    #[serde(rename = "rootcause")]
    pub root_cause: String,
    pub restored: String,
    pub ith: Vec<StatusHistoryEntry>,
    pub logs: Vec<TicketLog>,
}

impl Ticket {
    /// Closed and cancelled tickets drop out of every "live" view.
    pub fn is_active(&self) -> bool {
        self.state != STATE_CLOSED && self.state != STATE_CANCEL
    }
}

/// A support engineer or admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub is_active: bool,
    pub is_admin: bool,
    /// Derived from the rotation slot on read, so always `Some` there.
    /// On write `Some(true)` takes the slot, `Some(false)` gives it up and
    /// `None` leaves it where it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<bool>,
    pub engineer: bool,
    /// Identifier in the external directory.
    pub attuid: String,
}

impl User {
    pub fn in_rotation(&self) -> bool {
        self.is_active && self.engineer
    }

    pub fn is_current(&self) -> bool {
        self.current == Some(true)
    }
}

/// A ticket number paired with a defect id found in (or filed against) it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefectLink {
    pub number: String,
    pub defect: String,
}

/// Reduced ticket projection returned by the report views.
/// Views only fill the fields they project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub number: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(rename = "isoopened", skip_serializing_if = "Option::is_none")]
    pub iso_opened: Option<DateTime<Utc>>,
    #[serde(rename = "isolastmodified", skip_serializing_if = "Option::is_none")]
    pub iso_last_modified: Option<DateTime<Utc>>,
    #[serde(rename = "isoclosed", skip_serializing_if = "Option::is_none")]
    pub iso_closed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    #[serde(rename = "num")]
    pub number: String,
    pub state: String,
    pub owner: String,
}

/// Open tickets held by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub owner: String,
    pub tickets: Vec<WorkloadEntry>,
}
