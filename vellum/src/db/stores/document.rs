// SPDX-License-Identifier: AGPL-3.0-or-later

//! Versioned document commands and single-document reads.
//!
//! A write never touches existing rows. Every create or update inserts a new version together
//! with all of its store rows, so earlier versions stay readable forever. Deleting a document
//! inserts a tombstone version which hides it from all "current" reads.
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use sqlx::any::AnyConnection;
use sqlx::{query, query_as, query_scalar};
use uuid::{NoContext, Timestamp, Uuid};

use crate::db::errors::DocumentStorageError;
use crate::db::models::DocumentVersionRow;
use crate::db::stores::block_meta::{insert_block_meta, item_ids_by_path};
use crate::db::stores::field_values::insert_store_row;
use crate::db::stores::relationship::{relation_targets, remove_relationships, sync_relationships};
use crate::db::traits::{CollectionStore, DocumentStore};
use crate::db::types::{
    CreateVersionParams, CreatedVersion, DocumentContent, DocumentVersion, EventType,
    ReadOptions, StoredDocument, StoredRow,
};
use crate::db::{placeholders, timestamp, SqlStore, Transaction};
use crate::document::{collect_block_meta, flatten, reconstruct_document, LocaleFilter, StoreRow};
use crate::schema::Collection;

fn fatal(err: sqlx::Error) -> DocumentStorageError {
    DocumentStorageError::FatalStorageError(err.to_string())
}

/// Returns a new UUIDv7 which sorts after the previous version id of the same document.
///
/// Ids minted within the same millisecond are not ordered by themselves, in that case the
/// timestamp of the previous id is advanced by one millisecond.
pub(crate) fn next_version_id(previous: Option<&str>) -> String {
    let candidate = Uuid::now_v7();

    let previous = match previous.and_then(|previous| Uuid::parse_str(previous).ok()) {
        Some(previous) => previous,
        None => return candidate.to_string(),
    };

    if candidate > previous {
        return candidate.to_string();
    }

    let (seconds, nanos) = previous
        .get_timestamp()
        .map(|timestamp| timestamp.to_unix())
        .unwrap_or_default();
    let next = Duration::new(seconds, nanos) + Duration::from_millis(1);

    Uuid::new_v7(Timestamp::from_unix(
        NoContext,
        next.as_secs(),
        next.subsec_nanos(),
    ))
    .to_string()
}

async fn latest_version(
    connection: &mut AnyConnection,
    document_id: &str,
) -> Result<Option<DocumentVersionRow>, sqlx::Error> {
    query_as::<_, DocumentVersionRow>(
        "
        SELECT
            version_id,
            document_id,
            collection_id,
            path,
            event_type,
            status,
            locale,
            is_deleted,
            created_by,
            created_at
        FROM
            document_versions
        WHERE
            document_id = $1
        ORDER BY
            version_id DESC
        LIMIT
            1
        ",
    )
    .bind(document_id)
    .fetch_optional(connection)
    .await
}

async fn insert_version(
    connection: &mut AnyConnection,
    version: &DocumentVersion,
) -> Result<(), sqlx::Error> {
    query(
        "
        INSERT INTO
            document_versions (
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            )
        VALUES
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(&version.version_id)
    .bind(&version.document_id)
    .bind(&version.collection_id)
    .bind(&version.path)
    .bind(version.event_type.as_str())
    .bind(&version.status)
    .bind(&version.locale)
    .bind(version.is_deleted)
    .bind(&version.created_by)
    .bind(&version.created_at)
    .execute(connection)
    .await?;

    Ok(())
}

fn check_expected_version(
    expected: Option<&str>,
    latest: Option<&DocumentVersionRow>,
) -> Result<(), DocumentStorageError> {
    let expected = match expected {
        Some(expected) => expected,
        None => return Ok(()),
    };

    let current = latest.map(|row| row.version_id.as_str()).unwrap_or_default();
    if current != expected {
        return Err(DocumentStorageError::VersionConflict {
            expected: expected.to_string(),
            current: current.to_string(),
        });
    }

    Ok(())
}

/// Commits the transaction when the work inside it succeeded, rolls it back otherwise.
async fn finish<T>(
    tx: Transaction<'_>,
    result: Result<T, DocumentStorageError>,
) -> Result<T, DocumentStorageError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(fatal)?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await.map_err(fatal)?;
            Err(err)
        }
    }
}

/// Inserts a tombstone version after the current one.
async fn insert_tombstone(
    connection: &mut AnyConnection,
    document_id: &str,
    created_by: Option<&str>,
    expected_version_id: Option<&str>,
) -> Result<DocumentVersion, DocumentStorageError> {
    let latest = latest_version(&mut *connection, document_id)
        .await
        .map_err(fatal)?
        .ok_or_else(|| DocumentStorageError::DocumentNotFound(document_id.to_string()))?;

    if latest.is_deleted {
        return Err(DocumentStorageError::Deleted(document_id.to_string()));
    }
    check_expected_version(expected_version_id, Some(&latest))?;

    let version = DocumentVersion {
        version_id: next_version_id(Some(&latest.version_id)),
        document_id: document_id.to_string(),
        collection_id: latest.collection_id,
        path: latest.path,
        event_type: EventType::Delete,
        status: latest.status,
        locale: latest.locale,
        is_deleted: true,
        created_by: created_by.map(str::to_string),
        created_at: timestamp(),
    };

    insert_version(&mut *connection, &version)
        .await
        .map_err(fatal)?;
    remove_relationships(&mut *connection, document_id)
        .await
        .map_err(fatal)?;

    Ok(version)
}

/// Inserts a new version with its store rows, block meta and relationship edges.
async fn insert_document_version(
    connection: &mut AnyConnection,
    params: &CreateVersionParams,
    locale: String,
    rows: &[StoreRow],
) -> Result<DocumentVersion, DocumentStorageError> {
    let collections: i64 = query_scalar(
        "
        SELECT
            COUNT(*)
        FROM
            collections
        WHERE
            collection_id = $1
        ",
    )
    .bind(&params.collection_id)
    .fetch_one(&mut *connection)
    .await
    .map_err(fatal)?;

    if collections == 0 {
        return Err(DocumentStorageError::CollectionNotFound(
            params.collection_id.clone(),
        ));
    }

    let document_id = params
        .document_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let latest = latest_version(&mut *connection, &document_id)
        .await
        .map_err(fatal)?;

    if let Some(latest) = &latest {
        if latest.is_deleted {
            return Err(DocumentStorageError::Deleted(document_id));
        }

        if latest.collection_id != params.collection_id {
            return Err(DocumentStorageError::WrongCollection {
                document_id,
                collection_id: params.collection_id.clone(),
            });
        }
    }
    check_expected_version(params.expected_version_id.as_deref(), latest.as_ref())?;

    // Block elements without an id keep the item id they had at the same path before
    let previous_item_ids = match &latest {
        Some(latest) => item_ids_by_path(&mut *connection, &latest.version_id)
            .await
            .map_err(fatal)?,
        None => HashMap::new(),
    };
    let block_meta = collect_block_meta(&params.document, &params.collection, &previous_item_ids)?;

    let event_type = params.action.unwrap_or(match latest {
        Some(_) => EventType::Update,
        None => EventType::Create,
    });

    let path = params
        .path
        .clone()
        .or_else(|| latest.as_ref().map(|latest| latest.path.clone()))
        .unwrap_or_else(|| document_id.clone());

    let version = DocumentVersion {
        version_id: next_version_id(latest.as_ref().map(|latest| latest.version_id.as_str())),
        document_id,
        collection_id: params.collection_id.clone(),
        path,
        event_type,
        status: params.status.clone(),
        locale,
        is_deleted: false,
        created_by: params.created_by.clone(),
        created_at: timestamp(),
    };

    query(
        "
        INSERT INTO
            documents (
                document_id,
                collection_id,
                created_at
            )
        VALUES
            ($1, $2, $3)
        ON CONFLICT (document_id) DO NOTHING
        ",
    )
    .bind(&version.document_id)
    .bind(&version.collection_id)
    .bind(&version.created_at)
    .execute(&mut *connection)
    .await
    .map_err(fatal)?;

    insert_version(&mut *connection, &version)
        .await
        .map_err(fatal)?;

    for row in rows {
        insert_store_row(
            &mut *connection,
            &version.version_id,
            &version.collection_id,
            row,
        )
        .await
        .map_err(fatal)?;
    }

    for meta in &block_meta {
        insert_block_meta(&mut *connection, &version.version_id, meta)
            .await
            .map_err(fatal)?;
    }

    sync_relationships(&mut *connection, &version.document_id, &relation_targets(rows))
        .await
        .map_err(fatal)?;

    Ok(version)
}

impl SqlStore {
    async fn write_tombstone(
        &self,
        document_id: &str,
        created_by: Option<&str>,
        expected_version_id: Option<&str>,
    ) -> Result<DocumentVersion, DocumentStorageError> {
        let mut tx = self.pool.begin().await.map_err(fatal)?;
        let result =
            insert_tombstone(&mut *tx, document_id, created_by, expected_version_id).await;
        let version = finish(tx, result).await?;

        info!(
            "Deleted document {} with tombstone version {}",
            document_id, version.version_id
        );

        Ok(version)
    }

    /// Loads the content of many versions with one fan-in query, keeping their order.
    pub(crate) async fn load_documents(
        &self,
        versions: Vec<DocumentVersion>,
        options: &ReadOptions,
    ) -> Result<Vec<StoredDocument>, DocumentStorageError> {
        let version_ids: Vec<String> = versions
            .iter()
            .map(|version| version.version_id.clone())
            .collect();

        let mut rows_by_version: HashMap<String, Vec<StoredRow>> = HashMap::new();
        for row in self.get_field_values(&version_ids, &options.locale).await? {
            rows_by_version
                .entry(row.document_version_id.clone())
                .or_default()
                .push(row);
        }

        if !options.reconstruct {
            return Ok(versions
                .into_iter()
                .map(|version| {
                    let rows = rows_by_version
                        .remove(&version.version_id)
                        .unwrap_or_default();
                    StoredDocument {
                        version,
                        content: DocumentContent::Raw(rows),
                    }
                })
                .collect());
        }

        let mut block_meta = self.get_block_meta_batch(&version_ids).await?;
        let mut collections: HashMap<String, Collection> = HashMap::new();
        let mut documents = Vec::with_capacity(versions.len());

        for version in versions {
            if !collections.contains_key(&version.collection_id) {
                let stored = self
                    .get_collection(&version.collection_id)
                    .await?
                    .ok_or_else(|| {
                        DocumentStorageError::CollectionNotFound(version.collection_id.clone())
                    })?;
                collections.insert(version.collection_id.clone(), stored.collection);
            }

            let collection = &collections[&version.collection_id];
            let rows: Vec<StoreRow> = rows_by_version
                .remove(&version.version_id)
                .unwrap_or_default()
                .into_iter()
                .map(|row| row.row)
                .collect();
            let meta = block_meta.remove(&version.version_id).unwrap_or_default();

            let document =
                reconstruct_document(&rows, &meta, collection, &self.locales, &options.locale)?;

            documents.push(StoredDocument {
                version,
                content: DocumentContent::Reconstructed(document),
            });
        }

        Ok(documents)
    }

    async fn load_document(
        &self,
        row: Option<DocumentVersionRow>,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError> {
        let version = match row {
            Some(row) => DocumentVersion::try_from(row)?,
            None => return Ok(None),
        };

        let mut documents = self.load_documents(vec![version], options).await?;
        Ok(documents.pop())
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn create_document_version(
        &self,
        params: &CreateVersionParams,
    ) -> Result<CreatedVersion, DocumentStorageError> {
        if params.action == Some(EventType::Delete) {
            let document_id = params
                .document_id
                .as_deref()
                .ok_or(DocumentStorageError::MissingDocumentId)?;
            let version = self
                .write_tombstone(
                    document_id,
                    params.created_by.as_deref(),
                    params.expected_version_id.as_deref(),
                )
                .await?;

            return Ok(CreatedVersion {
                version,
                field_count: 0,
            });
        }

        let locale = params
            .locale
            .clone()
            .unwrap_or_else(|| self.locales.default_locale().to_string());

        // Invalid documents are rejected before anything touches the database
        let rows = flatten(&params.document, &params.collection, &self.locales, &locale)?;
        debug!("Flattened document into {} store rows", rows.len());

        let mut tx = self.pool.begin().await.map_err(fatal)?;
        let result = insert_document_version(&mut *tx, params, locale, &rows).await;
        let version = finish(tx, result).await?;

        info!(
            "Created version {} ({}) of document {} with {} field values",
            version.version_id,
            version.event_type,
            version.document_id,
            rows.len()
        );

        Ok(CreatedVersion {
            version,
            field_count: rows.len(),
        })
    }

    async fn delete_logical_document(
        &self,
        document_id: &str,
        created_by: Option<&str>,
    ) -> Result<DocumentVersion, DocumentStorageError> {
        self.write_tombstone(document_id, created_by, None).await
    }

    async fn get_document_by_id(
        &self,
        document_id: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError> {
        let row = query_as::<_, DocumentVersionRow>(
            "
            SELECT
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            FROM
                current_documents
            WHERE
                document_id = $1
            ",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(fatal)?;

        self.load_document(row, options).await
    }

    async fn get_document_by_path(
        &self,
        collection_id: &str,
        path: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError> {
        let row = query_as::<_, DocumentVersionRow>(
            "
            SELECT
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            FROM
                current_documents
            WHERE
                collection_id = $1
                AND path = $2
            ORDER BY
                version_id DESC
            LIMIT
                1
            ",
        )
        .bind(collection_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(fatal)?;

        self.load_document(row, options).await
    }

    async fn get_document_by_version(
        &self,
        version_id: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError> {
        let row = query_as::<_, DocumentVersionRow>(
            "
            SELECT
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            FROM
                document_versions
            WHERE
                version_id = $1
            ",
        )
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(fatal)?;

        self.load_document(row, options).await
    }

    async fn get_documents(
        &self,
        version_ids: &[String],
        locale: &LocaleFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStorageError> {
        if version_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "
            SELECT
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            FROM
                document_versions
            WHERE
                version_id IN ({})
            ",
            placeholders(1, version_ids.len())
        );

        let mut statement = query_as::<_, DocumentVersionRow>(&sql);
        for version_id in version_ids {
            statement = statement.bind(version_id);
        }

        let mut rows: HashMap<String, DocumentVersionRow> = statement
            .fetch_all(&self.pool)
            .await
            .map_err(fatal)?
            .into_iter()
            .map(|row| (row.version_id.clone(), row))
            .collect();

        // Follow the order of the requested ids
        let versions = version_ids
            .iter()
            .filter_map(|version_id| rows.remove(version_id))
            .map(DocumentVersion::try_from)
            .collect::<Result<Vec<DocumentVersion>, DocumentStorageError>>()?;

        self.load_documents(versions, &ReadOptions::new(locale.to_owned()))
            .await
    }
}
