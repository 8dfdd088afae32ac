// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent storage for versioned documents supporting both Postgres and SQLite databases.
//!
//! The main interface is [`SqlStore`]. Field values live in seven typed tables, one per
//! [`StoreKind`](crate::schema::StoreKind), and are read back with a single `UNION ALL` query
//! across all of them.
use anyhow::{Error, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::any::{Any, AnyPool, AnyPoolOptions};
use sqlx::migrate;
use sqlx::migrate::MigrateDatabase;

use crate::config::{Configuration, Locales};

pub mod errors;
pub mod models;
pub mod stores;
pub mod traits;
pub mod types;

/// SQL based persistent storage for collections and their versioned documents.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pub(crate) pool: Pool,

    /// Locales accepted on write, the default one is used for non-localized values.
    pub(crate) locales: Locales,

    /// Page size used when a paginated query does not ask for one.
    pub(crate) page_size: u64,

    /// Upper bound for requested page sizes.
    pub(crate) max_page_size: u64,
}

impl SqlStore {
    /// Create a new `SqlStore` using the provided db `Pool` and default settings.
    pub fn new(pool: Pool) -> Self {
        Self::with_config(pool, &Configuration::default())
    }

    /// Create a new `SqlStore` with locale and pagination settings taken from the configuration.
    pub fn with_config(pool: Pool, config: &Configuration) -> Self {
        Self {
            pool,
            locales: config.locales(),
            page_size: config.page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// Create the database if needed, connect to it and bring its schema up to date.
    pub async fn connect(config: &Configuration) -> Result<Self> {
        create_database(&config.database_url).await?;
        let pool = connection_pool(&config.database_url, config.database_max_connections).await?;
        run_pending_migrations(&pool).await?;

        Ok(Self::with_config(pool, config))
    }

    /// Locales this store accepts.
    pub fn locales(&self) -> &Locales {
        &self.locales
    }
}

/// Re-export of generic connection pool type.
pub type Pool = AnyPool;

/// Transaction on the generic connection pool.
pub(crate) type Transaction<'a> = sqlx::Transaction<'a, Any>;

/// Returns true for SQLite urls pointing at an in-memory database.
pub(crate) fn is_in_memory(url: &str) -> bool {
    url.starts_with("sqlite") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Create database when not existing.
pub async fn create_database(url: &str) -> Result<()> {
    if is_in_memory(url) {
        return Ok(());
    }

    if !Any::database_exists(url).await? {
        Any::create_database(url).await?;
    }

    Ok(())
}

/// Create a database agnostic connection pool.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool, Error> {
    let pool: Pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &Pool) -> Result<()> {
    migrate!().run(pool).await?;
    Ok(())
}

/// Current time as RFC 3339 string with microsecond precision, used for all `created_at` columns.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Builds a comma-separated list of `count` numbered placeholders, starting at `$first`.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|index| format!("${}", index))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{is_in_memory, placeholders};

    #[test]
    fn builds_placeholders() {
        assert_eq!(placeholders(1, 3), "$1, $2, $3");
        assert_eq!(placeholders(4, 1), "$4");
        assert_eq!(placeholders(2, 0), "");
    }

    #[rstest]
    #[case("sqlite::memory:", true)]
    #[case("sqlite://dbmem1?mode=memory&cache=shared", true)]
    #[case("sqlite:file:dbmem1?mode=memory&cache=shared", true)]
    #[case("sqlite://vellum.sqlite3", false)]
    #[case("postgres://localhost/vellum", false)]
    fn detects_in_memory_databases(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_in_memory(url), expected);
    }
}
