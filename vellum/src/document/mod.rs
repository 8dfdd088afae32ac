// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversion between nested documents and flat, typed store rows.
//!
//! [`flatten`] walks a document along its collection schema and emits one [`StoreRow`] per
//! scalar value and locale, [`reconstruct`] reverses this. Block elements keep a stable identity
//! across versions, which is tracked separately as [`BlockMeta`].
mod block_meta;
mod errors;
mod flatten;
mod locale;
mod reconstruct;
mod store_row;

pub use block_meta::{attach_block_meta, collect_block_meta, BlockMeta};
pub use errors::{FlattenError, ReconstructError};
pub use flatten::flatten;
pub use locale::LocaleFilter;
pub use reconstruct::{reconstruct, reconstruct_document};
pub use store_row::{
    DateTimeValue, FileValue, NumericValue, RelationValue, StoreRow, StoreValue,
};
