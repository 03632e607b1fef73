//! # Rusty-Tickets Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod config;

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rt_api::debug::{configure_debug, DebugState};
use rt_api::handlers::AppState;
use rt_api::middleware::{cors_policy, standard_middleware};
use rt_core::defects::DefectExtractor;

#[cfg(feature = "db-sqlite")]
use rt_db_sqlite::SqliteStore;

use crate::config::Settings;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let settings = Settings::from_env().context("reading configuration")?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(settings.log_level.as_str()));

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(
        SqliteStore::new(&settings.database_url)
            .await
            .with_context(|| format!("opening {}", settings.database_url))?,
    );

    // 2. Defect link matcher
    let extractor = DefectExtractor::new(&settings.tracker_host, settings.min_gap, settings.max_gap)
        .context("building defect link pattern")?;

    // 3. Wrap in AppState (one store behind every port)
    let state = web::Data::new(AppState {
        tickets: store.clone(),
        users: store.clone(),
        defects: store.clone(),
        extractor,
        week_numbering: settings.week_numbering,
    });

    log::info!("Rusty-Tickets starting on http://{}:{}", settings.bind_addr, settings.port);

    let api = HttpServer::new(move || {
        App::new()
            .wrap(cors_policy())
            .wrap(standard_middleware())
            .app_data(state.clone())
            .configure(rt_api::configure_routes)
    })
    .bind((settings.bind_addr.as_str(), settings.port))
    .with_context(|| format!("binding {}:{}", settings.bind_addr, settings.port))?
    .run();

    match settings.profiling_port {
        Some(port) => {
            let debug_state = web::Data::new(DebugState {
                started: Instant::now(),
                settings: settings.public_view()?,
                health: store,
            });
            log::info!("debug endpoints on http://{}:{}/debug", settings.bind_addr, port);
            let debug = HttpServer::new(move || {
                App::new()
                    .wrap(standard_middleware())
                    .app_data(debug_state.clone())
                    .configure(configure_debug)
            })
            .workers(1)
            .bind((settings.bind_addr.as_str(), port))
            .with_context(|| format!("binding debug port {port}"))?
            .run();
            tokio::try_join!(api, debug)?;
        }
        None => api.await?,
    }
    Ok(())
}
