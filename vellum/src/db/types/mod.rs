// SPDX-License-Identifier: AGPL-3.0-or-later

//! Structs representing data which has been retrieved from or is written to the store.
//!
//! As data coming from the db is trusted these structs are constructed without validating it
//! against the collection schema again.
mod collection;
mod document;
mod page;

pub use collection::StoredCollection;
pub use document::{
    CreateVersionParams, CreatedVersion, DocumentContent, DocumentVersion, EventType,
    ReadOptions, StoredDocument, StoredRow,
};
pub use page::{History, HistoryQuery, Page, PageMeta, PageOrder, PageQuery};
