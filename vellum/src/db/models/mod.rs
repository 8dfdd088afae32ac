// SPDX-License-Identifier: AGPL-3.0-or-later

//! Structs representing rows in SQL tables. Needed when coercing results returned from a
//! query using the `sqlx` library.
mod block_meta;
mod collection;
mod document;
mod field_value;

pub use block_meta::BlockMetaRow;
pub use collection::CollectionRow;
pub use document::DocumentVersionRow;
pub use field_value::FieldValueRow;
