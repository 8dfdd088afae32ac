// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Serialize;

use crate::schema::Collection;

/// A collection as persisted in the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCollection {
    pub collection_id: String,

    /// Unique, human readable identifier of the collection, for example "articles".
    pub path: String,

    pub collection: Collection,

    pub created_at: String,
}
