//! # rt-api
//!
//! The web routing and orchestration layer for Rusty-Tickets.

pub mod debug;
pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::{error::Error as ActixError, web, HttpRequest};
use rt_core::error::AppError;

use crate::error::ApiError;

fn bad_body(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> ActixError {
    log::debug!("rejected body: {err}");
    ApiError(AppError::ValidationError("Incorrect body".into())).into()
}

fn bad_path(err: actix_web::error::PathError, _req: &HttpRequest) -> ActixError {
    log::debug!("rejected path: {err}");
    ApiError(AppError::ValidationError("Incorrect path parameter".into())).into()
}

/// Configures the `/api` routes.
///
/// # Developer Note
/// Fixed segments (`/tickets/active`, `/users/next`, ...) are registered
/// before their parameterised siblings; actix stops at the first resource
/// whose pattern matches, whatever the method.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(bad_body))
        .app_data(web::PathConfig::default().error_handler(bad_path))
        .service(
            web::scope("/api")
                // Tickets
                .route("/tickets", web::get().to(handlers::all_tickets))
                .route("/tickets/active", web::get().to(handlers::active_tickets))
                .route("/tickets/queued", web::get().to(handlers::queued_tickets))
                .route("/tickets/report/{year}/{week}", web::get().to(handlers::report_opened))
                .route("/tickets/reportclosed/{year}/{week}", web::get().to(handlers::report_closed))
                .route("/tickets/{number}", web::delete().to(handlers::delete_ticket))
                .route("/ticket", web::post().to(handlers::add_ticket))
                .service(
                    web::resource("/ticket/{number}")
                        .route(web::get().to(handlers::ticket_by_number))
                        .route(web::put().to(handlers::update_ticket)),
                )
                .route("/backlog/{date}", web::get().to(handlers::backlog))
                .route("/workload", web::get().to(handlers::workload))
                // Users
                .route("/users", web::get().to(handlers::all_users))
                .route("/users/active", web::get().to(handlers::active_users))
                .route("/users/blacklisted", web::get().to(handlers::blacklisted_users))
                .route("/users/admins", web::get().to(handlers::admin_users))
                .route("/users/current", web::get().to(handlers::current_user))
                .route("/users/next", web::get().to(handlers::next_user))
                .route("/user", web::post().to(handlers::add_user))
                .route("/user/isadmin/{uid}", web::get().to(handlers::is_admin))
                // GET kept for callers of the first version of this API.
                .service(
                    web::resource("/user/blacklist/{uid}")
                        .route(web::put().to(handlers::blacklist_user))
                        .route(web::get().to(handlers::blacklist_user)),
                )
                .service(
                    web::resource("/user/whitelist/{uid}")
                        .route(web::put().to(handlers::whitelist_user))
                        .route(web::get().to(handlers::whitelist_user)),
                )
                .service(
                    web::resource("/user/{uid}")
                        .route(web::get().to(handlers::get_user))
                        .route(web::put().to(handlers::update_user))
                        .route(web::delete().to(handlers::delete_user)),
                )
                .route("/attuser/{attuid}", web::get().to(handlers::get_att_user))
                // Defects
                .route("/defects", web::get().to(handlers::search_defects))
                .route("/defect", web::post().to(handlers::add_defect))
                .route("/defect/{defect}", web::get().to(handlers::get_defect)),
        );
}
