// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors which occur when resolving a path against a document tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path did not contain any segments.
    #[error("Path is empty")]
    EmptyPath,

    /// An index or id segment was applied to a value which is not an array.
    #[error("Expected array at segment '{0}'")]
    ExpectedArray(String),

    /// A field segment was applied to a value which is not an object.
    #[error("Expected object at segment '{0}'")]
    ExpectedObject(String),

    /// Nothing is stored at this segment.
    #[error("Nothing found at segment '{0}'")]
    NotFound(String),

    /// No array element carries the given id.
    #[error("No item with id '{0}' found")]
    IdNotFound(String),

    /// A positional index points outside of the array.
    #[error("Index {index} is out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl PathError {
    /// Returns true when the error only signals that the addressed value is absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, PathError::NotFound(_) | PathError::IdNotFound(_))
    }
}
