//! Debug router, mounted on its own port by the binary when
//! `PROFILING_PORT` is set.

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpResponse};
use rt_core::traits::HealthCheck;
use serde::Serialize;

pub struct DebugState {
    pub started: Instant,
    /// Effective non-secret settings, rendered as-is by `/debug/config`.
    pub settings: serde_json::Value,
    pub health: Arc<dyn HealthCheck>,
}

#[derive(Serialize)]
struct Status {
    version: &'static str,
    uptime_secs: u64,
    store: &'static str,
}

async fn status(data: web::Data<DebugState>) -> HttpResponse {
    let store = match data.health.ping().await {
        Ok(()) => "pass",
        Err(err) => {
            log::warn!("store ping failed: {err}");
            "fail"
        }
    };
    HttpResponse::Ok().json(Status {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: data.started.elapsed().as_secs(),
        store,
    })
}

async fn config(data: web::Data<DebugState>) -> HttpResponse {
    HttpResponse::Ok().json(&data.settings)
}

pub fn configure_debug(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/debug")
            .route("/status", web::get().to(status))
            .route("/config", web::get().to(config)),
    );
}
