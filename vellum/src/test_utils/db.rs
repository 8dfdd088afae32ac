// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::migrate::MigrateDatabase;
use sqlx::Any;

use crate::db::{connection_pool, create_database, is_in_memory, run_pending_migrations, Pool};

/// Create test database and bring it up to date.
pub async fn initialize_db(url: &str) -> Pool {
    // Reset database first
    drop_database(url).await;
    create_database(url).await.unwrap();

    // Create connection pool and run all migrations
    let pool = connection_pool(url, 5).await.unwrap();
    run_pending_migrations(&pool)
        .await
        .expect("Could not run migrations on test database");

    pool
}

/// Delete test database.
pub async fn drop_database(url: &str) {
    if is_in_memory(url) {
        return;
    }

    if Any::database_exists(url).await.unwrap() {
        Any::drop_database(url).await.unwrap();
    }
}
