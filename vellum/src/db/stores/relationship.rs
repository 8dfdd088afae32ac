// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::BTreeSet;

use sqlx::any::AnyConnection;
use sqlx::{query, query_scalar};

use crate::db::errors::DocumentStorageError;
use crate::db::{timestamp, SqlStore};
use crate::document::{StoreRow, StoreValue};

/// Ids of all documents the rows point at through relation fields.
pub(crate) fn relation_targets(rows: &[StoreRow]) -> BTreeSet<String> {
    rows.iter()
        .filter_map(|row| match &row.value {
            StoreValue::Relation(relation) => Some(relation.target_document_id.clone()),
            _ => None,
        })
        .collect()
}

/// Replaces the outgoing edges of a document with edges to the given targets.
pub(crate) async fn sync_relationships(
    connection: &mut AnyConnection,
    parent_document_id: &str,
    targets: &BTreeSet<String>,
) -> Result<(), sqlx::Error> {
    remove_relationships(connection, parent_document_id).await?;

    let created_at = timestamp();
    for child_document_id in targets {
        query(
            "
            INSERT INTO
                document_relationships (
                    parent_document_id,
                    child_document_id,
                    created_at
                )
            VALUES
                ($1, $2, $3)
            ON CONFLICT (parent_document_id, child_document_id) DO NOTHING
            ",
        )
        .bind(parent_document_id)
        .bind(child_document_id)
        .bind(&created_at)
        .execute(&mut *connection)
        .await?;
    }

    Ok(())
}

pub(crate) async fn remove_relationships(
    connection: &mut AnyConnection,
    parent_document_id: &str,
) -> Result<(), sqlx::Error> {
    query(
        "
        DELETE FROM
            document_relationships
        WHERE
            parent_document_id = $1
        ",
    )
    .bind(parent_document_id)
    .execute(connection)
    .await?;

    Ok(())
}

impl SqlStore {
    /// Ids of the documents the current version of this document points at.
    pub async fn get_related_documents(
        &self,
        document_id: &str,
    ) -> Result<Vec<String>, DocumentStorageError> {
        query_scalar(
            "
            SELECT
                child_document_id
            FROM
                document_relationships
            WHERE
                parent_document_id = $1
            ORDER BY
                child_document_id
            ",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| DocumentStorageError::FatalStorageError(err.to_string()))
    }

    /// Ids of the current documents pointing at this document.
    pub async fn get_referencing_documents(
        &self,
        document_id: &str,
    ) -> Result<Vec<String>, DocumentStorageError> {
        query_scalar(
            "
            SELECT
                document_relationships.parent_document_id
            FROM
                document_relationships
            JOIN current_documents
                ON current_documents.document_id = document_relationships.parent_document_id
            WHERE
                document_relationships.child_document_id = $1
            ORDER BY
                document_relationships.parent_document_id
            ",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| DocumentStorageError::FatalStorageError(err.to_string()))
    }
}
