// SPDX-License-Identifier: AGPL-3.0-or-later

//! Storage traits implemented by [`SqlStore`](crate::db::SqlStore).
use async_trait::async_trait;

use crate::db::errors::{CollectionStorageError, DocumentStorageError};
use crate::db::types::{
    CreateVersionParams, CreatedVersion, DocumentVersion, ReadOptions, StoredCollection,
    StoredDocument,
};
use crate::document::LocaleFilter;
use crate::schema::Collection;

/// Storage of collection schemas.
#[async_trait]
pub trait CollectionStore {
    /// Persist a new collection under a unique path.
    async fn create_collection(
        &self,
        path: &str,
        collection: &Collection,
    ) -> Result<StoredCollection, CollectionStorageError>;

    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<StoredCollection>, CollectionStorageError>;

    async fn get_collection_by_path(
        &self,
        path: &str,
    ) -> Result<Option<StoredCollection>, CollectionStorageError>;

    /// Replace the field definitions of a collection. Versions written earlier keep their rows,
    /// rows which do not resolve against the new definitions are skipped on read.
    async fn update_collection(
        &self,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<StoredCollection, CollectionStorageError>;

    /// Delete a collection which no document belongs to.
    async fn delete_collection(&self, collection_id: &str) -> Result<(), CollectionStorageError>;
}

/// Storage of versioned documents.
#[async_trait]
pub trait DocumentStore {
    /// Write a new immutable version of a logical document.
    ///
    /// Flattening, inserting the version, its store rows, block meta and relationship edges all
    /// happen in one transaction. Nothing is written when any step fails.
    async fn create_document_version(
        &self,
        params: &CreateVersionParams,
    ) -> Result<CreatedVersion, DocumentStorageError>;

    /// Write a tombstone version, hiding the document from every current read.
    async fn delete_logical_document(
        &self,
        document_id: &str,
        created_by: Option<&str>,
    ) -> Result<DocumentVersion, DocumentStorageError>;

    /// Current version of a logical document, `None` when unknown or deleted.
    async fn get_document_by_id(
        &self,
        document_id: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError>;

    /// Current version of the document at this path inside a collection.
    async fn get_document_by_path(
        &self,
        collection_id: &str,
        path: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError>;

    /// Any version, including superseded ones and tombstones.
    async fn get_document_by_version(
        &self,
        version_id: &str,
        options: &ReadOptions,
    ) -> Result<Option<StoredDocument>, DocumentStorageError>;

    /// Reconstruct many versions with one fan-in query. Results follow the order of the given
    /// ids, unknown ids are left out.
    async fn get_documents(
        &self,
        version_ids: &[String],
        locale: &LocaleFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStorageError>;
}
