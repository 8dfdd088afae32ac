// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::path::PathError;

/// Errors raised when flattening a document into store rows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    #[error("Expected {expected} at '{path}'")]
    InvalidValue { path: String, expected: &'static str },

    #[error("Invalid {date_type} '{value}' at '{path}'")]
    InvalidDateTime {
        path: String,
        value: String,
        date_type: &'static str,
    },

    #[error("Value '{value}' at '{path}' is not one of the select options")]
    InvalidOption { path: String, value: String },

    #[error("Unknown block type '{name}' at '{path}'")]
    UnknownBlockType { path: String, name: String },

    #[error("Unknown locale '{locale}' at '{path}'")]
    UnknownLocale { path: String, locale: String },
}

/// Errors raised when reassembling a document from store rows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("Conflicting store rows at '{path}': {source}")]
    Path { path: String, source: PathError },
}
