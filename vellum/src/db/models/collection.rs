// SPDX-License-Identifier: AGPL-3.0-or-later

use serde_json::Value;
use sqlx::FromRow;

use crate::db::errors::CollectionStorageError;
use crate::db::types::StoredCollection;
use crate::schema::Collection;

/// A struct representing a single row of the `collections` table.
#[derive(FromRow, Debug, Clone)]
pub struct CollectionRow {
    pub collection_id: String,
    pub path: String,

    /// Field definitions encoded as JSON.
    pub config: String,

    pub created_at: String,
}

impl TryFrom<CollectionRow> for StoredCollection {
    type Error = CollectionStorageError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        let config: Value = serde_json::from_str(&row.config)
            .map_err(|err| CollectionStorageError::FatalStorageError(err.to_string()))?;

        Ok(StoredCollection {
            collection_id: row.collection_id,
            path: row.path,
            collection: Collection::from_json(&config)?,
            created_at: row.created_at,
        })
    }
}
