// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::document::{FlattenError, ReconstructError};
use crate::schema::SchemaError;

/// `SqlStore` errors for collection commands and queries.
#[derive(thiserror::Error, Debug)]
pub enum CollectionStorageError {
    /// Error returned from the database.
    #[error("A fatal error occured in CollectionStore: {0}")]
    FatalStorageError(String),

    /// Stored collection config can not be parsed anymore.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Collection with path '{0}' already exists")]
    DuplicatePath(String),

    #[error("Collection {0} not found")]
    NotFound(String),

    /// Collections can only be deleted once no document belongs to them anymore.
    #[error("Collection {0} is still referenced by documents")]
    InUse(String),
}

/// `SqlStore` errors for document commands and queries.
#[derive(thiserror::Error, Debug)]
pub enum DocumentStorageError {
    /// Error returned from the database.
    #[error("A fatal error occured in DocumentStore: {0}")]
    FatalStorageError(String),

    /// Document does not fit the collection it is written to.
    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A fan-in row carried a discriminant none of the store tables produces.
    #[error("Unknown field type '{0}' in stored field values")]
    UnknownFieldType(String),

    /// A fan-in row lacks the columns its discriminant requires.
    #[error("Invalid {kind} value stored at '{path}'")]
    InvalidStoredValue { path: String, kind: &'static str },

    #[error("Collection {0} not found")]
    CollectionNotFound(String),

    #[error("Document {0} not found")]
    DocumentNotFound(String),

    /// Deleting a document requires its id.
    #[error("Missing document id")]
    MissingDocumentId,

    /// A logical document never moves between collections.
    #[error("Document {document_id} does not belong to collection {collection_id}")]
    WrongCollection {
        document_id: String,
        collection_id: String,
    },

    /// The write expected another version to be the current one.
    #[error("Expected version {expected} to be current, found {current}")]
    VersionConflict { expected: String, current: String },

    /// Logical document has been deleted, no further versions can be added.
    #[error("Document {0} has been deleted")]
    Deleted(String),
}

impl From<CollectionStorageError> for DocumentStorageError {
    fn from(err: CollectionStorageError) -> Self {
        match err {
            CollectionStorageError::Schema(err) => DocumentStorageError::Schema(err),
            CollectionStorageError::NotFound(collection_id) => {
                DocumentStorageError::CollectionNotFound(collection_id)
            }
            err => DocumentStorageError::FatalStorageError(err.to_string()),
        }
    }
}
