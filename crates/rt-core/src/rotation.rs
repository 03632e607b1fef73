//! # Current-user rotation
//!
//! Exactly one engineer is "current" (on duty for incoming work). The store
//! keeps a single pointer to that user; this module decides who comes next
//! and which operations the pointer forbids.

use crate::error::{AppError, Result};
use crate::models::User;

/// The user after `current_id` among active engineers, ordered by id and
/// wrapping around. `None` when nobody is current or nobody is eligible.
///
/// When the current user has left the eligible set (e.g. an admin edited
/// the record), the next eligible id after it still takes over.
pub fn next_in_rotation<'a>(users: &'a [User], current_id: Option<&str>) -> Option<&'a User> {
    let current_id = current_id?;
    let mut eligible: Vec<&User> = users.iter().filter(|u| u.in_rotation()).collect();
    eligible.sort_by(|a, b| a.id.cmp(&b.id));

    eligible
        .iter()
        .find(|u| u.id.as_str() > current_id)
        .or_else(|| eligible.first())
        .copied()
}

/// Refuses `action` on `user_id` while it holds the rotation pointer.
pub fn ensure_not_current(user_id: &str, current_id: Option<&str>, action: &str) -> Result<()> {
    if current_id == Some(user_id) {
        log::info!("refusing to {action} current user {user_id}");
        return Err(AppError::Conflict(format!(
            "This user is current. Please execute next user before {action} this"
        )));
    }
    Ok(())
}
