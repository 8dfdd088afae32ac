// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

use crate::db::errors::DocumentStorageError;
use crate::document::BlockMeta;

/// A struct representing a single row of the `block_meta` table.
#[derive(FromRow, Debug, Clone)]
pub struct BlockMetaRow {
    pub document_version_id: String,
    pub path: String,
    pub item_id: String,
    pub block_type: String,
    pub meta: Option<String>,
}

impl TryFrom<BlockMetaRow> for BlockMeta {
    type Error = DocumentStorageError;

    fn try_from(row: BlockMetaRow) -> Result<Self, Self::Error> {
        let meta = row
            .meta
            .map(|meta| serde_json::from_str(&meta))
            .transpose()
            .map_err(|err| DocumentStorageError::FatalStorageError(err.to_string()))?;

        Ok(BlockMeta {
            path: row.path,
            item_id: row.item_id,
            block_type: row.block_type,
            meta,
        })
    }
}
