// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use sqlx::any::AnyConnection;
use sqlx::{query, query_as};

use crate::db::errors::DocumentStorageError;
use crate::db::models::BlockMetaRow;
use crate::db::{placeholders, SqlStore};
use crate::document::BlockMeta;

pub(crate) async fn insert_block_meta(
    connection: &mut AnyConnection,
    document_version_id: &str,
    block_meta: &BlockMeta,
) -> Result<(), sqlx::Error> {
    query(
        "
        INSERT INTO
            block_meta (
                document_version_id,
                path,
                item_id,
                block_type,
                meta
            )
        VALUES
            ($1, $2, $3, $4, $5)
        ",
    )
    .bind(document_version_id)
    .bind(&block_meta.path)
    .bind(&block_meta.item_id)
    .bind(&block_meta.block_type)
    .bind(block_meta.meta.as_ref().map(|meta| meta.to_string()))
    .execute(connection)
    .await?;

    Ok(())
}

/// Item ids of the block elements of a version, keyed by their path.
pub(crate) async fn item_ids_by_path(
    connection: &mut AnyConnection,
    document_version_id: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows = query_as::<_, BlockMetaRow>(
        "
        SELECT
            document_version_id,
            path,
            item_id,
            block_type,
            meta
        FROM
            block_meta
        WHERE
            document_version_id = $1
        ",
    )
    .bind(document_version_id)
    .fetch_all(connection)
    .await?;

    Ok(rows.into_iter().map(|row| (row.path, row.item_id)).collect())
}

impl SqlStore {
    /// Returns the block meta of one document version, ordered by path.
    pub async fn get_block_meta(
        &self,
        version_id: &str,
    ) -> Result<Vec<BlockMeta>, DocumentStorageError> {
        let mut block_meta = self.get_block_meta_batch(&[version_id.to_string()]).await?;
        Ok(block_meta.remove(version_id).unwrap_or_default())
    }

    /// Returns the block meta of many document versions, grouped by version id.
    pub(crate) async fn get_block_meta_batch(
        &self,
        version_ids: &[String],
    ) -> Result<HashMap<String, Vec<BlockMeta>>, DocumentStorageError> {
        if version_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "
            SELECT
                document_version_id,
                path,
                item_id,
                block_type,
                meta
            FROM
                block_meta
            WHERE
                document_version_id IN ({})
            ORDER BY
                document_version_id, path
            ",
            placeholders(1, version_ids.len())
        );

        let mut statement = query_as::<_, BlockMetaRow>(&sql);
        for version_id in version_ids {
            statement = statement.bind(version_id);
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DocumentStorageError::FatalStorageError(err.to_string()))?;

        let mut grouped: HashMap<String, Vec<BlockMeta>> = HashMap::new();
        for row in rows {
            let version_id = row.document_version_id.clone();
            grouped
                .entry(version_id)
                .or_default()
                .push(BlockMeta::try_from(row)?);
        }

        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::traits::{CollectionStore, DocumentStore};
    use crate::db::types::CreateVersionParams;
    use crate::db::SqlStore;
    use crate::test_utils::{article_collection, test_runner};

    #[test]
    fn block_meta_per_version() {
        test_runner(|store: SqlStore| async move {
            let articles = store
                .create_collection("articles", &article_collection())
                .await
                .unwrap();

            let created = store
                .create_document_version(&CreateVersionParams::new(
                    &articles.collection_id,
                    &articles.collection,
                    json!({
                        "content": [
                            {
                                "id": "intro",
                                "type": "block",
                                "name": "hero",
                                "fields": { "heading": "Hi" },
                                "meta": { "collapsed": true }
                            },
                            { "type": "block", "name": "gallery", "fields": {} }
                        ]
                    }),
                ))
                .await
                .unwrap();

            let block_meta = store
                .get_block_meta(&created.version.version_id)
                .await
                .unwrap();
            assert_eq!(block_meta.len(), 2);

            assert_eq!(block_meta[0].path, "content.0");
            assert_eq!(block_meta[0].item_id, "intro");
            assert_eq!(block_meta[0].block_type, "hero");
            assert_eq!(block_meta[0].meta, Some(json!({ "collapsed": true })));

            assert_eq!(block_meta[1].path, "content.1");
            assert_eq!(block_meta[1].block_type, "gallery");
            assert_eq!(block_meta[1].meta, None);

            assert!(store.get_block_meta("unknown").await.unwrap().is_empty());
        });
    }
}
