// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use log::info;
use sqlx::{query, query_as, query_scalar};
use uuid::Uuid;

use crate::db::errors::CollectionStorageError;
use crate::db::models::CollectionRow;
use crate::db::traits::CollectionStore;
use crate::db::types::StoredCollection;
use crate::db::{timestamp, SqlStore};
use crate::schema::Collection;

fn fatal(err: sqlx::Error) -> CollectionStorageError {
    CollectionStorageError::FatalStorageError(err.to_string())
}

#[async_trait]
impl CollectionStore for SqlStore {
    async fn create_collection(
        &self,
        path: &str,
        collection: &Collection,
    ) -> Result<StoredCollection, CollectionStorageError> {
        if self.get_collection_by_path(path).await?.is_some() {
            return Err(CollectionStorageError::DuplicatePath(path.to_string()));
        }

        let stored = StoredCollection {
            collection_id: Uuid::new_v4().to_string(),
            path: path.to_string(),
            collection: collection.to_owned(),
            created_at: timestamp(),
        };

        query(
            "
            INSERT INTO
                collections (
                    collection_id,
                    path,
                    config,
                    created_at
                )
            VALUES
                ($1, $2, $3, $4)
            ",
        )
        .bind(&stored.collection_id)
        .bind(&stored.path)
        .bind(collection.to_json().to_string())
        .bind(&stored.created_at)
        .execute(&self.pool)
        .await
        .map_err(fatal)?;

        info!(
            "Created collection {} at path '{}'",
            stored.collection_id, stored.path
        );

        Ok(stored)
    }

    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<StoredCollection>, CollectionStorageError> {
        let row = query_as::<_, CollectionRow>(
            "
            SELECT
                collection_id,
                path,
                config,
                created_at
            FROM
                collections
            WHERE
                collection_id = $1
            ",
        )
        .bind(collection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(fatal)?;

        row.map(StoredCollection::try_from).transpose()
    }

    async fn get_collection_by_path(
        &self,
        path: &str,
    ) -> Result<Option<StoredCollection>, CollectionStorageError> {
        let row = query_as::<_, CollectionRow>(
            "
            SELECT
                collection_id,
                path,
                config,
                created_at
            FROM
                collections
            WHERE
                path = $1
            ",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(fatal)?;

        row.map(StoredCollection::try_from).transpose()
    }

    async fn update_collection(
        &self,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<StoredCollection, CollectionStorageError> {
        let result = query(
            "
            UPDATE
                collections
            SET
                config = $1
            WHERE
                collection_id = $2
            ",
        )
        .bind(collection.to_json().to_string())
        .bind(collection_id)
        .execute(&self.pool)
        .await
        .map_err(fatal)?;

        if result.rows_affected() == 0 {
            return Err(CollectionStorageError::NotFound(collection_id.to_string()));
        }

        info!("Updated fields of collection {}", collection_id);

        self.get_collection(collection_id)
            .await?
            .ok_or_else(|| CollectionStorageError::NotFound(collection_id.to_string()))
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<(), CollectionStorageError> {
        // Tombstoned documents count as well, their history still points at the collection
        let documents: i64 = query_scalar(
            "
            SELECT
                COUNT(*)
            FROM
                documents
            WHERE
                collection_id = $1
            ",
        )
        .bind(collection_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fatal)?;

        if documents > 0 {
            return Err(CollectionStorageError::InUse(collection_id.to_string()));
        }

        let result = query(
            "
            DELETE FROM
                collections
            WHERE
                collection_id = $1
            ",
        )
        .bind(collection_id)
        .execute(&self.pool)
        .await
        .map_err(fatal)?;

        if result.rows_affected() == 0 {
            return Err(CollectionStorageError::NotFound(collection_id.to_string()));
        }

        info!("Deleted collection {}", collection_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::errors::CollectionStorageError;
    use crate::db::traits::{CollectionStore, DocumentStore};
    use crate::db::types::CreateVersionParams;
    use crate::db::SqlStore;
    use crate::schema::Collection;
    use crate::test_utils::{article_collection, author_collection, test_runner};

    #[test]
    fn create_and_get_collection() {
        test_runner(|store: SqlStore| async move {
            let collection = article_collection();
            let created = store
                .create_collection("articles", &collection)
                .await
                .unwrap();

            let by_id = store
                .get_collection(&created.collection_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(by_id, created);
            assert_eq!(by_id.collection, collection);

            let by_path = store
                .get_collection_by_path("articles")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(by_path.collection_id, created.collection_id);

            assert!(store.get_collection("unknown").await.unwrap().is_none());
        });
    }

    #[test]
    fn paths_are_unique() {
        test_runner(|store: SqlStore| async move {
            store
                .create_collection("authors", &author_collection())
                .await
                .unwrap();

            let result = store
                .create_collection("authors", &author_collection())
                .await;
            assert!(matches!(
                result,
                Err(CollectionStorageError::DuplicatePath(path)) if path == "authors"
            ));
        });
    }

    #[test]
    fn update_collection_fields() {
        test_runner(|store: SqlStore| async move {
            let created = store
                .create_collection("authors", &author_collection())
                .await
                .unwrap();

            let updated_fields = Collection::from_json(&json!({
                "fields": [{ "name": "name", "type": "text", "required": true }]
            }))
            .unwrap();

            let updated = store
                .update_collection(&created.collection_id, &updated_fields)
                .await
                .unwrap();
            assert_eq!(updated.collection, updated_fields);
            assert_eq!(updated.path, "authors");

            assert!(matches!(
                store.update_collection("unknown", &updated_fields).await,
                Err(CollectionStorageError::NotFound(_))
            ));
        });
    }

    #[test]
    fn delete_only_unused_collections() {
        test_runner(|store: SqlStore| async move {
            let authors = store
                .create_collection("authors", &author_collection())
                .await
                .unwrap();
            let empty = store
                .create_collection("empty", &author_collection())
                .await
                .unwrap();

            store
                .create_document_version(&CreateVersionParams::new(
                    &authors.collection_id,
                    &authors.collection,
                    json!({ "name": "Ada" }),
                ))
                .await
                .unwrap();

            assert!(matches!(
                store.delete_collection(&authors.collection_id).await,
                Err(CollectionStorageError::InUse(_))
            ));

            store.delete_collection(&empty.collection_id).await.unwrap();
            assert!(store
                .get_collection(&empty.collection_id)
                .await
                .unwrap()
                .is_none());

            assert!(matches!(
                store.delete_collection(&empty.collection_id).await,
                Err(CollectionStorageError::NotFound(_))
            ));
        });
    }
}
