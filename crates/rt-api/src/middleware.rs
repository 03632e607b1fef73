//! rusty-tickets/crates/rt-api/src/middleware.rs Middleware
//!
//! Access logging and CORS for the ticket API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Access log in the default format:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

// The dashboard is served from another origin and writes users and tickets.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}
