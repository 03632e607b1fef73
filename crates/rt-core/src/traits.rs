//! # Core Traits (Ports)
//!
//! Any store plugin must implement these traits to be used by the binary.
//! Report and extraction logic never talks to a store directly; handlers
//! fetch a snapshot through these ports and hand it to the pure functions.

use async_trait::async_trait;
use crate::error::Result;
use crate::models::{DefectLink, Ticket, User};

/// Persistence contract for tickets. `number` is the unique key.
#[async_trait]
pub trait TicketRepo: Send + Sync {
    /// All tickets ordered by canonical opened instant, oldest first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>>;
    async fn get_ticket(&self, number: &str) -> Result<Option<Ticket>>;

    /// Fails with `AppError::Duplicate` when the number is taken.
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;
    /// Replaces the stored document. Fails with `AppError::NotFound` when absent.
    async fn replace_ticket(&self, number: &str, ticket: &Ticket) -> Result<()>;
    async fn delete_ticket(&self, number: &str) -> Result<()>;
}

/// Which slice of the user collection to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    /// Every engineer, active or not.
    Engineers,
    Active,
    Blacklisted,
    Admins,
}

impl UserFilter {
    pub fn matches(self, user: &User) -> bool {
        match self {
            UserFilter::Engineers => user.engineer,
            UserFilter::Active => user.engineer && user.is_active,
            UserFilter::Blacklisted => user.engineer && !user.is_active,
            UserFilter::Admins => user.is_admin,
        }
    }
}

/// Persistence contract for users and the current-user rotation slot.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Users matching `filter`, ordered by id.
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>>;
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_attuid(&self, attuid: &str) -> Result<Option<User>>;
    async fn current_user(&self) -> Result<Option<User>>;

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn replace_user(&self, id: &str, user: &User) -> Result<()>;

    /// Refuses with `AppError::Conflict` while the user holds the rotation slot.
    async fn delete_user(&self, id: &str) -> Result<()>;
    /// Blacklist (`false`) or whitelist (`true`). Blacklisting the current
    /// user is refused with `AppError::Conflict`.
    async fn set_active(&self, id: &str, active: bool) -> Result<()>;

    /// Hands the rotation slot to the next active engineer.
    /// `Ok(None)` when nobody currently holds it.
    async fn advance_current(&self) -> Result<Option<User>>;
}

/// Persistence contract for recorded ticket/defect mappings.
#[async_trait]
pub trait DefectRepo: Send + Sync {
    async fn insert_defect(&self, link: &DefectLink) -> Result<()>;
    async fn find_defect(&self, defect: &str) -> Result<Vec<DefectLink>>;
}

/// Liveness probe for whatever backs the repos.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
