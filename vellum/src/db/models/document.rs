// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

use crate::db::errors::DocumentStorageError;
use crate::db::types::DocumentVersion;

/// A struct representing a single row of the `document_versions` table or the
/// `current_documents` view.
#[derive(FromRow, Debug, Clone)]
pub struct DocumentVersionRow {
    pub version_id: String,
    pub document_id: String,
    pub collection_id: String,
    pub path: String,
    pub event_type: String,
    pub status: String,
    pub locale: String,
    pub is_deleted: bool,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl TryFrom<DocumentVersionRow> for DocumentVersion {
    type Error = DocumentStorageError;

    fn try_from(row: DocumentVersionRow) -> Result<Self, Self::Error> {
        let event_type = row
            .event_type
            .parse()
            .map_err(DocumentStorageError::FatalStorageError)?;

        Ok(DocumentVersion {
            version_id: row.version_id,
            document_id: row.document_id,
            collection_id: row.collection_id,
            path: row.path,
            event_type,
            status: row.status,
            locale: row.locale,
            is_deleted: row.is_deleted,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}
