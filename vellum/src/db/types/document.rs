// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::document::{LocaleFilter, StoreRow};
use crate::schema::Collection;

/// What caused a document version to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Create,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(EventType::Create),
            "update" => Ok(EventType::Update),
            "delete" => Ok(EventType::Delete),
            _ => Err(format!("Unknown event type '{}'", s)),
        }
    }
}

/// One immutable snapshot of a logical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentVersion {
    /// Time-ordered UUIDv7, the greatest one of a document is its current version.
    pub version_id: String,

    /// Stable identity of the logical document across all of its versions.
    pub document_id: String,

    pub collection_id: String,

    pub path: String,

    pub event_type: EventType,

    pub status: String,

    /// Locale plain values of localized fields were written under.
    pub locale: String,

    /// Tombstone marker, set on the version created when deleting a document.
    pub is_deleted: bool,

    pub created_by: Option<String>,

    pub created_at: String,
}

/// A store row as persisted in one of the typed tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub id: String,
    pub document_version_id: String,
    pub collection_id: String,
    #[serde(flatten)]
    pub row: StoreRow,
}

/// Content of a document read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentContent {
    /// Nested document rebuilt from its field values.
    Reconstructed(Value),

    /// Field values as they are stored.
    Raw(Vec<StoredRow>),
}

impl DocumentContent {
    /// Returns the reconstructed document, `None` for raw content.
    pub fn document(&self) -> Option<&Value> {
        match self {
            DocumentContent::Reconstructed(document) => Some(document),
            DocumentContent::Raw(_) => None,
        }
    }
}

/// A document version together with its content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub version: DocumentVersion,
    pub content: DocumentContent,
}

/// Options for reading documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub locale: LocaleFilter,

    /// Rebuild the nested document when true, return the stored field values otherwise.
    pub reconstruct: bool,
}

impl ReadOptions {
    pub fn new(locale: LocaleFilter) -> Self {
        Self {
            locale,
            reconstruct: true,
        }
    }

    /// Read the raw field values instead of rebuilding the document.
    pub fn raw(mut self) -> Self {
        self.reconstruct = false;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new(LocaleFilter::All)
    }
}

/// Parameters for writing a new document version.
#[derive(Debug, Clone)]
pub struct CreateVersionParams {
    /// Logical document to add a version to, a new one is created when not given.
    pub document_id: Option<String>,

    pub collection_id: String,

    /// Schema the document is flattened against. It is authoritative for this write, even if
    /// the stored collection config differs.
    pub collection: Collection,

    /// Event recorded for the version, derived from the document's history when not given.
    pub action: Option<EventType>,

    pub document: Value,

    /// Path of the document inside its collection, defaults to the previous version's path or
    /// the document id.
    pub path: Option<String>,

    /// Locale plain values of localized fields are written under, defaults to the default
    /// locale.
    pub locale: Option<String>,

    pub status: String,

    pub created_by: Option<String>,

    /// When set the write only succeeds if this is still the current version.
    pub expected_version_id: Option<String>,
}

impl CreateVersionParams {
    pub fn new(collection_id: &str, collection: &Collection, document: Value) -> Self {
        Self {
            document_id: None,
            collection_id: collection_id.to_owned(),
            collection: collection.to_owned(),
            action: None,
            document,
            path: None,
            locale: None,
            status: "draft".into(),
            created_by: None,
            expected_version_id: None,
        }
    }

    pub fn document_id(mut self, document_id: &str) -> Self {
        self.document_id = Some(document_id.to_owned());
        self
    }

    pub fn action(mut self, action: EventType) -> Self {
        self.action = Some(action);
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_owned());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_owned();
        self
    }

    pub fn created_by(mut self, created_by: &str) -> Self {
        self.created_by = Some(created_by.to_owned());
        self
    }

    pub fn expected_version(mut self, version_id: &str) -> Self {
        self.expected_version_id = Some(version_id.to_owned());
        self
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedVersion {
    pub version: DocumentVersion,

    /// Number of store rows written for this version.
    pub field_count: usize,
}
