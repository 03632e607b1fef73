//! # Defect Extractor
//!
//! Engineers paste tracker links into ticket worklogs. This module finds
//! those links in the logs of live tickets and recovers the 6-digit defect
//! id from each one. Matching sits behind [`DefectExtractor::extract`] so the
//! engine can change without touching callers.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{DefectLink, Ticket};

pub const DEFAULT_TRACKER_HOST: &str = "sdp.web.att.com";
pub const DEFAULT_MIN_GAP: usize = 50;
pub const DEFAULT_MAX_GAP: usize = 83;

/// Coarse pre-filter for log lines worth scanning.
const WORKITEM_MARKER: &str = "workitem";

pub struct DefectExtractor {
    link_re: Regex,
    id_re: Regex,
}

impl DefectExtractor {
    /// Links look like `https://<host>` followed by `min_gap..=max_gap`
    /// non-blank characters, then `/` or `=` and a 6-digit id.
    pub fn new(tracker_host: &str, min_gap: usize, max_gap: usize) -> Result<Self> {
        if min_gap > max_gap {
            return Err(AppError::ValidationError(format!(
                "defect link gap {min_gap}..{max_gap} is empty"
            )));
        }
        let pattern = format!(
            r"https?://{}\S{{{},{}}}(/|=)\d{{6}}",
            regex::escape(tracker_host),
            min_gap,
            max_gap
        );
        let link_re = Regex::new(&pattern)
            .map_err(|e| AppError::ValidationError(format!("bad defect link pattern: {e}")))?;
        let id_re = Regex::new(r"\d{6}").map_err(|e| AppError::ValidationError(e.to_string()))?;
        Ok(Self { link_re, id_re })
    }

    /// Defect ids linked from `text`, one per link, in text order.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let flat = text.replace('\n', "");
        self.link_re
            .find_iter(&flat)
            .filter_map(|link| self.id_re.find(link.as_str()))
            .map(|id| id.as_str().to_string())
            .collect()
    }

    /// Every distinct (ticket, defect) pair linked from the worklogs of
    /// tickets that are neither closed nor cancelled.
    pub fn search(&self, tickets: &[Ticket]) -> Vec<DefectLink> {
        let mut found = BTreeSet::new();
        for ticket in tickets.iter().filter(|t| t.is_active()) {
            for entry in ticket.logs.iter().filter(|l| is_workitem(&l.info)) {
                for defect in self.extract(&entry.info) {
                    found.insert(DefectLink { number: ticket.number.clone(), defect });
                }
            }
        }
        log::debug!("defect search found {} links", found.len());
        found.into_iter().collect()
    }
}

impl Default for DefectExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKER_HOST, DEFAULT_MIN_GAP, DEFAULT_MAX_GAP)
            .expect("built-in defect pattern compiles")
    }
}

/// Case-insensitive substring match on "Workitem".
pub fn is_workitem(info: &str) -> bool {
    info.to_lowercase().contains(WORKITEM_MARKER)
}
