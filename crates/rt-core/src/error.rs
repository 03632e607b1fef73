//! # AppError
//!
//! Centralized error handling for Rusty-Tickets.
//! Maps store and input failures to the few kinds the HTTP layer distinguishes.

use thiserror::Error;

/// The primary error type for all rt-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Ticket, User, Defect)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed input (e.g., unreadable body, bad date in a path)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Unique key already taken (e.g., ticket number)
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Operation refused by the current state (e.g., deleting the current user)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, query failure)
    #[error("store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// A specialized Result type for Rusty-Tickets logic.
pub type Result<T> = std::result::Result<T, AppError>;
