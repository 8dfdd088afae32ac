// SPDX-License-Identifier: AGPL-3.0-or-later

//! Collection schemas: ordered field definitions which drive flattening and reconstruction.
mod collection;
mod errors;
mod field;

pub use collection::Collection;
pub use errors::SchemaError;
pub use field::{BlockDefinition, DateType, FieldDefinition, FieldType, NumberType, StoreKind};
