use std::sync::Arc;

use actix_web::web;
use rt_api::handlers::AppState;
use rt_core::defects::DefectExtractor;
use rt_core::report::WeekNumbering;
use rt_db_sqlite::SqliteStore;

/// App state over a fresh in-memory store.
pub async fn state_with(extractor: DefectExtractor) -> web::Data<AppState> {
    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    web::Data::new(AppState {
        tickets: store.clone(),
        users: store.clone(),
        defects: store,
        extractor,
        week_numbering: WeekNumbering::Sunday,
    })
}

pub async fn state() -> web::Data<AppState> {
    state_with(DefectExtractor::default()).await
}
