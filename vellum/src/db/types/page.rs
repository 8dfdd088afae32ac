// SPDX-License-Identifier: AGPL-3.0-or-later

use std::str::FromStr;

use serde::Serialize;

use crate::db::types::{DocumentVersion, StoredDocument};
use crate::document::LocaleFilter;

/// Column paginated listings are sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrder {
    /// Creation time of the logical document.
    CreatedAt,

    /// Creation time of the current version.
    #[default]
    UpdatedAt,

    Path,

    Status,
}

impl PageOrder {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            PageOrder::CreatedAt => "documents.created_at",
            PageOrder::UpdatedAt => "current_documents.created_at",
            PageOrder::Path => "current_documents.path",
            PageOrder::Status => "current_documents.status",
        }
    }
}

impl FromStr for PageOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(PageOrder::CreatedAt),
            "updatedAt" | "updated_at" => Ok(PageOrder::UpdatedAt),
            "path" => Ok(PageOrder::Path),
            "status" => Ok(PageOrder::Status),
            _ => Err(format!("Can not order documents by '{}'", s)),
        }
    }
}

/// Paginated listing of the current documents of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub collection_id: String,

    /// 1-based page number.
    pub page: u64,

    /// Falls back to the configured page size, capped at the configured maximum.
    pub page_size: Option<u64>,

    pub order: PageOrder,

    pub desc: bool,

    /// Case-insensitive substring filter on text field values.
    pub query: Option<String>,

    pub locale: LocaleFilter,
}

impl PageQuery {
    pub fn new(collection_id: &str) -> Self {
        Self {
            collection_id: collection_id.to_owned(),
            page: 1,
            page_size: None,
            order: PageOrder::default(),
            desc: false,
            query: None,
            locale: LocaleFilter::All,
        }
    }
}

/// Paginated version history of one logical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub document_id: String,

    /// Restricts the history to versions written to this collection.
    pub collection_id: Option<String>,

    pub page: u64,

    pub page_size: Option<u64>,
}

impl HistoryQuery {
    pub fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_owned(),
            collection_id: None,
            page: 1,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub(crate) fn new(page: u64, page_size: u64, total: u64) -> Self {
        Self {
            page,
            page_size,
            total,
            total_pages: total / page_size + u64::from(total % page_size != 0),
        }
    }
}

/// One page of current documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub documents: Vec<StoredDocument>,

    pub meta: PageMeta,

    /// Current versions of documents the page's documents point at through relation fields.
    pub included: Vec<StoredDocument>,
}

/// One page of a document's version history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History {
    pub versions: Vec<DocumentVersion>,
    pub meta: PageMeta,
}
