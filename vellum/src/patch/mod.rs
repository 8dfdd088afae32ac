// SPDX-License-Identifier: AGPL-3.0-or-later

//! Structural edits on reconstructed documents.
//!
//! Patches are applied in order to a deep copy of the document. Each patch either applies fully
//! or not at all, a failing patch is reported with its position in the batch and does not stop
//! the remaining ones.
mod apply;
mod errors;
mod operation;

pub use apply::{apply_patches, PatchFailure, PatchResult};
pub use errors::PatchError;
pub use operation::Patch;
