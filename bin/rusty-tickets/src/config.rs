//! Environment-driven settings. `.env` is loaded before this runs.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rt_core::defects::{DEFAULT_MAX_GAP, DEFAULT_MIN_GAP, DEFAULT_TRACKER_HOST};
use rt_core::report::WeekNumbering;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub profiling_port: Option<u16>,
    pub log_level: String,
    pub week_numbering: WeekNumbering,
    pub tracker_host: String,
    pub min_gap: usize,
    pub max_gap: usize,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{name}={raw:?}: {e}")),
        _ => Ok(None),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env_or("DATABASE_URL", "sqlite:tickets.db"),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0"),
            port: env_parse("PORT")?.unwrap_or(8080),
            profiling_port: env_parse("PROFILING_PORT")?,
            log_level: env_or("LOG_LEVEL", "info"),
            week_numbering: env_parse("REPORT_WEEK_NUMBERING")?.unwrap_or_default(),
            tracker_host: env_or("DEFECT_TRACKER_HOST", DEFAULT_TRACKER_HOST),
            min_gap: env_parse("DEFECT_LINK_MIN_GAP")?.unwrap_or(DEFAULT_MIN_GAP),
            max_gap: env_parse("DEFECT_LINK_MAX_GAP")?.unwrap_or(DEFAULT_MAX_GAP),
        })
    }

    /// What `/debug/config` shows. The database url may carry credentials.
    pub fn public_view(&self) -> Result<serde_json::Value> {
        let mut view = serde_json::to_value(self).context("serializing settings")?;
        if let Some(map) = view.as_object_mut() {
            map.remove("database_url");
        }
        Ok(view)
    }
}
