//! # rt-db-sqlite Implementation
//!
//! Document-style storage on SQLite. Each collection is a table holding the
//! JSON document plus the columns needed for keys and ordering, so records
//! round-trip unchanged while uniqueness and sort order stay in SQL.
//!
//! The "current user" lives in a single-row `rotation` table rather than a
//! flag on every user document; swapping it is one conditional update.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::SecondsFormat;
use rt_core::error::{AppError, Result};
use rt_core::models::{DefectLink, Ticket, User};
use rt_core::rotation::{ensure_not_current, next_in_rotation};
use rt_core::traits::{DefectRepo, HealthCheck, TicketRepo, UserFilter, UserRepo};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tickets (
        number     TEXT PRIMARY KEY NOT NULL,
        iso_opened TEXT,
        doc        TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS tickets_number ON tickets (number)",
    "CREATE INDEX IF NOT EXISTS tickets_iso_opened ON tickets (iso_opened)",
    "CREATE TABLE IF NOT EXISTS users (
        id     TEXT PRIMARY KEY NOT NULL,
        attuid TEXT NOT NULL DEFAULT '',
        doc    TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS users_attuid ON users (attuid)",
    "CREATE TABLE IF NOT EXISTS defects (
        number TEXT NOT NULL,
        defect TEXT NOT NULL,
        PRIMARY KEY (number, defect)
    )",
    "CREATE TABLE IF NOT EXISTS rotation (
        slot    INTEGER PRIMARY KEY CHECK (slot = 0),
        user_id TEXT
    )",
    "INSERT OR IGNORE INTO rotation (slot, user_id) VALUES (0, NULL)",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

fn store_err(e: sqlx::Error) -> AppError {
    log::error!("sqlite: {e}");
    AppError::Store(e.to_string())
}

fn json_err(e: serde_json::Error) -> AppError {
    log::error!("document encoding: {e}");
    AppError::Store(e.to_string())
}

/// Maps a unique-key violation to `Duplicate`, anything else to `Store`.
fn insert_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            AppError::Duplicate(message.to_string())
        } else {
            store_err(e)
        }
    }
}

fn decode<T: DeserializeOwned>(row: &SqliteRow) -> Result<T> {
    let doc: String = row.try_get("doc").map_err(store_err)?;
    serde_json::from_str(&doc).map_err(json_err)
}

fn encode<T: serde::Serialize>(doc: &T) -> Result<String> {
    serde_json::to_string(doc).map_err(json_err)
}

fn opened_key(ticket: &Ticket) -> Option<String> {
    ticket.iso_opened.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Users are stored without the `current` flag; it is derived from the slot.
fn stored_user(user: &User) -> User {
    User { current: None, ..user.clone() }
}

fn with_current(mut user: User, current_id: Option<&str>) -> User {
    user.current = Some(current_id == Some(user.id.as_str()));
    user
}

fn ineligible_claim() -> AppError {
    AppError::ValidationError("Only an active engineer can be the current user".to_string())
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
fn is_lock_contention(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
        _ => false,
    }
}

fn rotation_err(e: sqlx::Error) -> AppError {
    if is_lock_contention(&e) {
        log::info!("rotation contended: {e}");
        AppError::Conflict("current user changed while advancing, retry".to_string())
    } else {
        store_err(e)
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and ensures the schema.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(store_err)?
            .create_if_missing(true);

        // Every connection to `:memory:` is its own database.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await.map_err(store_err)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        log::info!("sqlite store ready at {url}");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(store_err)?;
        }
        Ok(())
    }

    async fn current_id(&self) -> Result<Option<String>> {
        let slot: Option<Option<String>> = sqlx::query_scalar("SELECT user_id FROM rotation WHERE slot = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(slot.flatten())
    }

    async fn current_id_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<Option<String>> {
        let slot: Option<Option<String>> = sqlx::query_scalar("SELECT user_id FROM rotation WHERE slot = 0")
            .fetch_optional(&mut **tx)
            .await
            .map_err(store_err)?;
        Ok(slot.flatten())
    }

    async fn user_tx(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn point_at_tx(tx: &mut Transaction<'_, Sqlite>, id: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE rotation SET user_id = ? WHERE slot = 0")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT doc FROM users WHERE {column} = ? ORDER BY id LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let user: Option<User> = row.as_ref().map(decode).transpose()?;
        let current = self.current_id().await?;
        Ok(user.map(|u| with_current(u, current.as_deref())))
    }
}

#[async_trait]
impl HealthCheck for SqliteStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl TicketRepo for SqliteStore {
    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query("SELECT doc FROM tickets ORDER BY iso_opened ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(decode).collect()
    }

    async fn get_ticket(&self, number: &str) -> Result<Option<Ticket>> {
        let row = sqlx::query("SELECT doc FROM tickets WHERE number = ?")
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query("INSERT INTO tickets (number, iso_opened, doc) VALUES (?, ?, ?)")
            .bind(&ticket.number)
            .bind(opened_key(ticket))
            .bind(encode(ticket)?)
            .execute(&self.pool)
            .await
            .map_err(insert_err("Ticket with this number already exists"))?;
        Ok(())
    }

    async fn replace_ticket(&self, number: &str, ticket: &Ticket) -> Result<()> {
        let done = sqlx::query("UPDATE tickets SET iso_opened = ?, doc = ? WHERE number = ?")
            .bind(opened_key(ticket))
            .bind(encode(ticket)?)
            .bind(number)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Ticket", number));
        }
        Ok(())
    }

    async fn delete_ticket(&self, number: &str) -> Result<()> {
        let done = sqlx::query("DELETE FROM tickets WHERE number = ?")
            .bind(number)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Ticket", number));
        }
        Ok(())
    }
}

fn user_clause(filter: UserFilter) -> &'static str {
    match filter {
        UserFilter::Engineers => "json_extract(doc, '$.engineer') = 1",
        UserFilter::Active => "json_extract(doc, '$.engineer') = 1 AND json_extract(doc, '$.is_active') = 1",
        UserFilter::Blacklisted => "json_extract(doc, '$.engineer') = 1 AND json_extract(doc, '$.is_active') = 0",
        UserFilter::Admins => "json_extract(doc, '$.is_admin') = 1",
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>> {
        let sql = format!("SELECT doc FROM users WHERE {} ORDER BY id", user_clause(filter));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(store_err)?;
        let current = self.current_id().await?;
        rows.iter()
            .map(|row| decode(row).map(|u| with_current(u, current.as_deref())))
            .collect()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.fetch_user("id", id).await
    }

    async fn get_user_by_attuid(&self, attuid: &str) -> Result<Option<User>> {
        self.fetch_user("attuid", attuid).await
    }

    async fn current_user(&self) -> Result<Option<User>> {
        match self.current_id().await? {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        if user.is_current() && !user.in_rotation() {
            return Err(ineligible_claim());
        }
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        sqlx::query("INSERT INTO users (id, attuid, doc) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.attuid)
            .bind(encode(&stored_user(user))?)
            .execute(&mut *tx)
            .await
            .map_err(insert_err("User with this uid already exists"))?;
        if user.is_current() {
            Self::point_at_tx(&mut tx, Some(&user.id)).await?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn replace_user(&self, id: &str, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let current = Self::current_id_tx(&mut tx).await?;
        if !user.in_rotation() {
            if user.current != Some(false) {
                ensure_not_current(id, current.as_deref(), "blacklist")?;
            }
            if user.is_current() {
                return Err(ineligible_claim());
            }
        }

        let done = sqlx::query("UPDATE users SET attuid = ?, doc = ? WHERE id = ?")
            .bind(&user.attuid)
            .bind(encode(&stored_user(user))?)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("User", id));
        }

        if user.current == Some(true) {
            Self::point_at_tx(&mut tx, Some(id)).await?;
        } else if user.current == Some(false) && current.as_deref() == Some(id) {
            log::warn!("user {id} written with current=false, rotation is now empty");
            Self::point_at_tx(&mut tx, None).await?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        if Self::user_tx(&mut tx, id).await?.is_none() {
            return Err(AppError::not_found("User", id));
        }
        let current = Self::current_id_tx(&mut tx).await?;
        ensure_not_current(id, current.as_deref(), "delete")?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut user = Self::user_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))?;
        if !active {
            let current = Self::current_id_tx(&mut tx).await?;
            ensure_not_current(id, current.as_deref(), "blacklist")?;
        }

        user.is_active = active;
        sqlx::query("UPDATE users SET doc = ? WHERE id = ?")
            .bind(encode(&stored_user(&user))?)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn advance_current(&self) -> Result<Option<User>> {
        let mut tx = self.pool.begin().await.map_err(rotation_err)?;
        // Take the write lock before reading the slot; concurrent advances
        // wait on the busy timeout instead of failing a lock upgrade.
        sqlx::query("UPDATE rotation SET user_id = user_id WHERE slot = 0")
            .execute(&mut *tx)
            .await
            .map_err(rotation_err)?;
        let Some(current) = Self::current_id_tx(&mut tx).await? else {
            log::info!("no current user, rotation not advanced");
            return Ok(None);
        };

        let sql = format!("SELECT doc FROM users WHERE {} ORDER BY id", user_clause(UserFilter::Active));
        let rows = sqlx::query(&sql).fetch_all(&mut *tx).await.map_err(store_err)?;
        let users = rows.iter().map(decode).collect::<Result<Vec<User>>>()?;

        let Some(mut next) = next_in_rotation(&users, Some(current.as_str())).cloned() else {
            log::warn!("no active engineer to take over from {current}");
            return Ok(None);
        };

        let swapped = sqlx::query("UPDATE rotation SET user_id = ? WHERE slot = 0 AND user_id = ?")
            .bind(&next.id)
            .bind(&current)
            .execute(&mut *tx)
            .await
            .map_err(rotation_err)?;
        if swapped.rows_affected() == 0 {
            return Err(AppError::Conflict("current user changed while advancing, retry".to_string()));
        }
        tx.commit().await.map_err(rotation_err)?;

        log::info!("current user {current} -> {}", next.id);
        next.current = Some(true);
        Ok(Some(next))
    }
}

#[async_trait]
impl DefectRepo for SqliteStore {
    async fn insert_defect(&self, link: &DefectLink) -> Result<()> {
        sqlx::query("INSERT INTO defects (number, defect) VALUES (?, ?)")
            .bind(&link.number)
            .bind(&link.defect)
            .execute(&self.pool)
            .await
            .map_err(insert_err("Defect already exists"))?;
        Ok(())
    }

    async fn find_defect(&self, defect: &str) -> Result<Vec<DefectLink>> {
        let rows = sqlx::query("SELECT number, defect FROM defects WHERE defect = ? ORDER BY number")
            .bind(defect)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter()
            .map(|row| {
                Ok(DefectLink {
                    number: row.try_get("number").map_err(store_err)?,
                    defect: row.try_get("defect").map_err(store_err)?,
                })
            })
            .collect()
    }
}
