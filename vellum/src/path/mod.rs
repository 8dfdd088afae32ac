// SPDX-License-Identifier: AGPL-3.0-or-later

//! Field path grammar shared by the patch engine and the flatten / reconstruct engine.
//!
//! Paths are dot-separated field names, each optionally followed by bracketed sub-tokens:
//! `reviews[0].rating` addresses an array element by position, `content[id=xyz].title` addresses
//! it by its stable `id`. Flattened store paths use plain numeric tokens instead (`images.0.alt`).
mod errors;
mod locate;
mod segment;

pub use errors::PathError;
pub(crate) use locate::position_by_id;
pub use locate::{ensure_path, get_by_segments, get_value, Key};
pub use segment::{build_path, join_store_path, parse_patch_path, parse_store_path, PathSegment};
