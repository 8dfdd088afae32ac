// SPDX-License-Identifier: AGPL-3.0-or-later

//! # vellum
//!
//! Storage and reconstruction engine for nested, localized and versioned documents.
//!
//! Documents are flattened against their collection schema into scalar "store rows" which land
//! in seven typed vertical tables (text, numeric, boolean, datetime, file, relation, json). Every
//! write creates a new immutable document version. Reads fan in over all seven tables with a
//! single `UNION ALL` query and rebuild the nested document tree from the returned rows.
//!
//! A small patch engine applies structural edits to already reconstructed documents in memory.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod config;
pub mod db;
pub mod document;
pub mod patch;
pub mod path;
pub mod schema;
#[cfg(test)]
mod test_utils;

pub use crate::config::{Configuration, Locales};
pub use crate::db::traits::{CollectionStore, DocumentStore};
pub use crate::db::types::{CreateVersionParams, PageQuery, ReadOptions};
pub use crate::db::SqlStore;
pub use crate::document::{flatten, reconstruct, LocaleFilter, StoreRow, StoreValue};
pub use crate::patch::{apply_patches, Patch, PatchResult};
pub use crate::schema::{Collection, FieldDefinition, FieldType};
