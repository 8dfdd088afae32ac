// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors which occur when parsing or validating a collection schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Field definition names a type the storage engine does not know how to persist.
    #[error("Unsupported field type '{0}'")]
    UnsupportedFieldType(String),

    #[error("Invalid number type '{0}', expected integer, decimal or float")]
    InvalidNumberType(String),

    #[error("Invalid date type '{0}', expected date, time or timestamp")]
    InvalidDateType(String),

    #[error("Field name '{0}' is used more than once")]
    DuplicateFieldName(String),

    /// Field names end up in dotted store paths and therefore can not contain separators or be
    /// purely numeric.
    #[error("Invalid field name '{0}'")]
    InvalidFieldName(String),

    /// A has-many relation is stored as one row per element, which can not carry a locale map
    /// per list.
    #[error("Has-many relation '{0}' can not be localized")]
    LocalizedHasMany(String),

    #[error("Blocks field '{0}' does not declare any blocks")]
    EmptyBlocks(String),

    /// Schema JSON could not be deserialized.
    #[error("Malformed collection schema: {0}")]
    Malformed(String),
}
