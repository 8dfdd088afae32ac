// SPDX-License-Identifier: AGPL-3.0-or-later

//! Implementations of the storage traits and additional query interfaces on `SqlStore`.
mod block_meta;
mod collection;
mod document;
mod field_values;
mod query;
mod relationship;
