//! # rt-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.
//! Handlers fetch a snapshot through the repos, hand it to the pure report
//! and extraction functions in `rt-core`, and render the result.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use rt_core::defects::DefectExtractor;
use rt_core::error::AppError;
use rt_core::models::{DefectLink, Ticket, User};
use rt_core::normalize::{normalize_ticket, parse_report_date};
use rt_core::report::{self, WeekBasis, WeekKey, WeekNumbering};
use rt_core::traits::{DefectRepo, TicketRepo, UserFilter, UserRepo};
use serde::Serialize;

use crate::error::ApiError;

type ApiResult = Result<HttpResponse, ApiError>;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub tickets: Arc<dyn TicketRepo>,
    pub users: Arc<dyn UserRepo>,
    pub defects: Arc<dyn DefectRepo>,
    pub extractor: DefectExtractor,
    pub week_numbering: WeekNumbering,
}

/// Indented JSON, the way the feed's consumers have always read it.
fn pretty<T: Serialize>(status: StatusCode, body: &T) -> ApiResult {
    let text = serde_json::to_string_pretty(body)?;
    Ok(HttpResponse::build(status)
        .content_type("application/json; charset=utf-8")
        .body(text))
}

fn created(req: &HttpRequest, key: &str) -> HttpResponse {
    HttpResponse::Created()
        .content_type("application/json")
        .insert_header(("Location", format!("{}/{}", req.path(), key)))
        .finish()
}

/// A body may omit its key; if it carries one it must match the path.
fn claim_key(path_key: &str, body_key: &mut String, kind: &str) -> Result<(), ApiError> {
    if body_key.is_empty() {
        *body_key = path_key.to_string();
    } else if body_key.as_str() != path_key {
        return Err(AppError::ValidationError(format!(
            "{kind} key {body_key:?} does not match {path_key:?}"
        ))
        .into());
    }
    Ok(())
}

// ── Tickets ──────────────────────────────────────────────────────────────────

pub async fn all_tickets(data: web::Data<AppState>) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &tickets)
}

pub async fn ticket_by_number(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let number = path.into_inner();
    match data.tickets.get_ticket(&number).await? {
        Some(ticket) => pretty(StatusCode::OK, &ticket),
        None => Err(AppError::not_found("Ticket", &number).into()),
    }
}

/// Normalizes timestamps, then stores a new ticket.
pub async fn add_ticket(data: web::Data<AppState>, req: HttpRequest, body: web::Json<Ticket>) -> ApiResult {
    let mut ticket = body.into_inner();
    if ticket.number.trim().is_empty() {
        return Err(AppError::ValidationError("Ticket number is required".into()).into());
    }
    normalize_ticket(&mut ticket);
    data.tickets.insert_ticket(&ticket).await?;
    log::info!("ticket {} created", ticket.number);
    Ok(created(&req, &ticket.number))
}

pub async fn update_ticket(data: web::Data<AppState>, path: web::Path<String>, body: web::Json<Ticket>) -> ApiResult {
    let number = path.into_inner();
    let mut ticket = body.into_inner();
    claim_key(&number, &mut ticket.number, "Ticket")?;
    normalize_ticket(&mut ticket);
    data.tickets.replace_ticket(&number, &ticket).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_ticket(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    data.tickets.delete_ticket(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn active_tickets(data: web::Data<AppState>) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &report::active(&tickets))
}

pub async fn queued_tickets(data: web::Data<AppState>) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &report::queued(&tickets))
}

async fn weekly(data: &AppState, basis: WeekBasis, year: i32, week: u32) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    let rows = report::weekly_report(&tickets, basis, WeekKey { year, week }, data.week_numbering);
    pretty(StatusCode::OK, &rows)
}

pub async fn report_opened(data: web::Data<AppState>, path: web::Path<(i32, u32)>) -> ApiResult {
    let (year, week) = path.into_inner();
    weekly(&data, WeekBasis::Opened, year, week).await
}

pub async fn report_closed(data: web::Data<AppState>, path: web::Path<(i32, u32)>) -> ApiResult {
    let (year, week) = path.into_inner();
    weekly(&data, WeekBasis::Closed, year, week).await
}

pub async fn backlog(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let date = parse_report_date(&path.into_inner())?;
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &report::backlog_at(&tickets, date))
}

pub async fn workload(data: web::Data<AppState>) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &report::workload(&tickets))
}

// ── Users ────────────────────────────────────────────────────────────────────

async fn users_where(data: &AppState, filter: UserFilter) -> ApiResult {
    let users = data.users.list_users(filter).await?;
    pretty(StatusCode::OK, &users)
}

pub async fn all_users(data: web::Data<AppState>) -> ApiResult {
    users_where(&data, UserFilter::Engineers).await
}

pub async fn active_users(data: web::Data<AppState>) -> ApiResult {
    users_where(&data, UserFilter::Active).await
}

pub async fn blacklisted_users(data: web::Data<AppState>) -> ApiResult {
    users_where(&data, UserFilter::Blacklisted).await
}

pub async fn admin_users(data: web::Data<AppState>) -> ApiResult {
    users_where(&data, UserFilter::Admins).await
}

pub async fn current_user(data: web::Data<AppState>) -> ApiResult {
    match data.users.current_user().await? {
        Some(user) => pretty(StatusCode::OK, &user),
        None => Err(AppError::not_found("Current user", "").into()),
    }
}

/// Hands the current-user slot to the next active engineer.
/// 204 when nobody is current.
pub async fn next_user(data: web::Data<AppState>) -> ApiResult {
    match data.users.advance_current().await? {
        Some(user) => pretty(StatusCode::OK, &user),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

fn found_user(user: Option<User>, key: &str) -> Result<User, ApiError> {
    user.ok_or_else(|| AppError::not_found("User", key).into())
}

pub async fn get_user(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let uid = path.into_inner();
    let user = found_user(data.users.get_user(&uid).await?, &uid)?;
    pretty(StatusCode::OK, &user)
}

pub async fn get_att_user(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let attuid = path.into_inner();
    let user = found_user(data.users.get_user_by_attuid(&attuid).await?, &attuid)?;
    pretty(StatusCode::OK, &user)
}

pub async fn is_admin(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let uid = path.into_inner();
    let user = found_user(data.users.get_user(&uid).await?, &uid)?;
    pretty(StatusCode::OK, &user.is_admin)
}

pub async fn blacklist_user(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    data.users.set_active(&path.into_inner(), false).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn whitelist_user(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    data.users.set_active(&path.into_inner(), true).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn add_user(data: web::Data<AppState>, req: HttpRequest, body: web::Json<User>) -> ApiResult {
    let user = body.into_inner();
    if user.id.trim().is_empty() {
        return Err(AppError::ValidationError("User id is required".into()).into());
    }
    data.users.insert_user(&user).await?;
    log::info!("user {} created", user.id);
    Ok(created(&req, &user.id))
}

pub async fn update_user(data: web::Data<AppState>, path: web::Path<String>, body: web::Json<User>) -> ApiResult {
    let uid = path.into_inner();
    let mut user = body.into_inner();
    claim_key(&uid, &mut user.id, "User")?;
    data.users.replace_user(&uid, &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_user(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    data.users.delete_user(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Defects ──────────────────────────────────────────────────────────────────

/// Defect ids linked from the worklogs of live tickets.
pub async fn search_defects(data: web::Data<AppState>) -> ApiResult {
    let tickets = data.tickets.list_tickets().await?;
    pretty(StatusCode::OK, &data.extractor.search(&tickets))
}

pub async fn add_defect(data: web::Data<AppState>, req: HttpRequest, body: web::Json<DefectLink>) -> ApiResult {
    let link = body.into_inner();
    if link.number.trim().is_empty() || link.defect.trim().is_empty() {
        return Err(AppError::ValidationError("Defect needs a number and a defect id".into()).into());
    }
    data.defects.insert_defect(&link).await?;
    Ok(created(&req, &link.defect))
}

pub async fn get_defect(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let defect = path.into_inner();
    let links = data.defects.find_defect(&defect).await?;
    if links.is_empty() {
        return Err(AppError::not_found("Defect", &defect).into());
    }
    pretty(StatusCode::OK, &links)
}
