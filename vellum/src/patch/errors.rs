// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::patch::PatchFailure;
use crate::path::PathError;

/// Errors which make a single patch fail.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Value at '{0}' is not an array")]
    NotAnArray(String),

    #[error("Expected object as block value at '{0}'")]
    NotAnObject(String),

    #[error("No item with id '{0}' found")]
    ItemNotFound(String),

    #[error("Block type '{0}' is not allowed here")]
    UnknownBlockType(String),

    /// One or more patches applied to an array item failed.
    #[error("{} nested patch(es) failed", .0.len())]
    Nested(Vec<PatchFailure>),
}
