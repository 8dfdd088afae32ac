// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::Debug;

use once_cell::sync::Lazy;
use serde::Deserialize;

/// Configuration read once from the environment for all tests.
pub static TEST_CONFIG: Lazy<TestConfiguration> = Lazy::new(TestConfiguration::new);

/// Configuration used in test helper methods.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct TestConfiguration {
    /// Database url (SQLite or PostgreSQL), an in-memory SQLite database is used when not set.
    pub database_url: Option<String>,
}

impl TestConfiguration {
    pub fn new() -> Self {
        envy::from_env::<TestConfiguration>()
            .expect("Could not read environment variables for test configuration")
    }

    /// Returns the configured database url or a new, uniquely named in-memory SQLite database.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.to_owned(),
            None => {
                // Give each database an unique name, the `file:` URI makes all connections of
                // the pool share it
                let db_name = format!("dbmem{}", rand::random::<u32>());
                format!("sqlite:file:{db_name}?mode=memory&cache=shared")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlx::{query, query_scalar};

    use crate::db::connection_pool;

    use super::TestConfiguration;

    #[tokio::test]
    async fn in_memory_database_is_shared_by_connections() {
        let url = TestConfiguration::default().database_url();
        let pool = connection_pool(&url, 2).await.unwrap();

        // Hold on to two connections at the same time
        let mut first = pool.acquire().await.unwrap();
        let mut second = pool.acquire().await.unwrap();

        query("CREATE TABLE shared_check (id INTEGER)")
            .execute(&mut first)
            .await
            .unwrap();
        let count: i64 = query_scalar("SELECT COUNT(*) FROM shared_check")
            .fetch_one(&mut second)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Every call names a new database
        assert_ne!(
            TestConfiguration::default().database_url(),
            TestConfiguration::default().database_url()
        );
    }
}
