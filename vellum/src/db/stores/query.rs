// SPDX-License-Identifier: AGPL-3.0-or-later

//! Paginated listings of current documents and of version histories.
use log::debug;
use sqlx::{query_as, query_scalar};

use crate::db::errors::DocumentStorageError;
use crate::db::models::DocumentVersionRow;
use crate::db::types::{
    DocumentVersion, History, HistoryQuery, Page, PageMeta, PageQuery, ReadOptions,
};
use crate::db::{placeholders, SqlStore};

fn fatal(err: sqlx::Error) -> DocumentStorageError {
    DocumentStorageError::FatalStorageError(err.to_string())
}

/// Escapes `LIKE` wildcards and wraps the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// `LIMIT` and `OFFSET` of a page, `None` when the page lies beyond what the database can
/// address.
fn page_window(page: u64, page_size: u64) -> Option<(i64, i64)> {
    let limit = i64::try_from(page_size).ok()?;
    let offset = page
        .saturating_sub(1)
        .checked_mul(page_size)
        .and_then(|offset| i64::try_from(offset).ok())?;
    Some((limit, offset))
}

impl SqlStore {
    /// Page size to use for a request, falling back to the configured one and capped at the
    /// configured maximum.
    fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    /// Lists the current documents of a collection, one page at a time.
    ///
    /// With a search term only documents are returned which carry a text value containing it,
    /// compared case-insensitively. Documents referenced through relation fields of the page's
    /// documents are returned as `included`, in their current version.
    pub async fn get_documents_by_page(
        &self,
        args: &PageQuery,
    ) -> Result<Page, DocumentStorageError> {
        let page = args.page.max(1);
        let page_size = self.page_size(args.page_size);
        let search = args.query.as_deref().filter(|query| !query.is_empty());

        let search_filter = match search {
            Some(_) => {
                "
                AND EXISTS (
                    SELECT
                        1
                    FROM
                        store_text
                    WHERE
                        store_text.document_version_id = current_documents.version_id
                        AND LOWER(store_text.value) LIKE LOWER($2) ESCAPE '\\'
                )
                "
            }
            None => "",
        };

        let count_sql = format!(
            "
            SELECT
                COUNT(*)
            FROM
                current_documents
            WHERE
                current_documents.collection_id = $1
                {}
            ",
            search_filter
        );

        let mut count_query = query_scalar::<_, i64>(&count_sql).bind(&args.collection_id);
        if let Some(term) = search {
            count_query = count_query.bind(like_pattern(term));
        }
        let total = count_query.fetch_one(&self.pool).await.map_err(fatal)? as u64;

        let direction = if args.desc { "DESC" } else { "ASC" };
        let first_limit_placeholder = if search.is_some() { 3 } else { 2 };

        let select_sql = format!(
            "
            SELECT
                current_documents.version_id,
                current_documents.document_id,
                current_documents.collection_id,
                current_documents.path,
                current_documents.event_type,
                current_documents.status,
                current_documents.locale,
                current_documents.is_deleted,
                current_documents.created_by,
                current_documents.created_at
            FROM
                current_documents
            JOIN documents
                ON documents.document_id = current_documents.document_id
            WHERE
                current_documents.collection_id = $1
                {search_filter}
            ORDER BY
                {order} {direction},
                current_documents.version_id {direction}
            LIMIT
                ${limit}
            OFFSET
                ${offset}
            ",
            search_filter = search_filter,
            order = args.order.column(),
            direction = direction,
            limit = first_limit_placeholder,
            offset = first_limit_placeholder + 1,
        );

        let rows = match page_window(page, page_size) {
            Some((limit, offset)) => {
                let mut select_query =
                    query_as::<_, DocumentVersionRow>(&select_sql).bind(&args.collection_id);
                if let Some(term) = search {
                    select_query = select_query.bind(like_pattern(term));
                }
                select_query
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(fatal)?
            }
            None => Vec::new(),
        };

        let versions = rows
            .into_iter()
            .map(DocumentVersion::try_from)
            .collect::<Result<Vec<DocumentVersion>, DocumentStorageError>>()?;

        let options = ReadOptions::new(args.locale.clone());
        let included_versions = self.included_versions(&versions).await?;
        let documents = self.load_documents(versions, &options).await?;
        let included = self.load_documents(included_versions, &options).await?;

        debug!(
            "Loaded page {} of collection {} with {} documents and {} included",
            page,
            args.collection_id,
            documents.len(),
            included.len()
        );

        Ok(Page {
            documents,
            meta: PageMeta::new(page, page_size, total),
            included,
        })
    }

    /// Current versions of the documents the given versions point at, leaving out documents
    /// which are part of the given versions themselves.
    async fn included_versions(
        &self,
        versions: &[DocumentVersion],
    ) -> Result<Vec<DocumentVersion>, DocumentStorageError> {
        if versions.is_empty() {
            return Ok(Vec::new());
        }

        let version_count = versions.len();
        let sql = format!(
            "
            SELECT
                current_documents.version_id,
                current_documents.document_id,
                current_documents.collection_id,
                current_documents.path,
                current_documents.event_type,
                current_documents.status,
                current_documents.locale,
                current_documents.is_deleted,
                current_documents.created_by,
                current_documents.created_at
            FROM
                current_documents
            WHERE
                current_documents.document_id IN (
                    SELECT
                        store_relation.target_document_id
                    FROM
                        store_relation
                    WHERE
                        store_relation.document_version_id IN ({})
                )
                AND current_documents.document_id NOT IN ({})
            ORDER BY
                current_documents.document_id
            ",
            placeholders(1, version_count),
            placeholders(version_count + 1, version_count)
        );

        let mut statement = query_as::<_, DocumentVersionRow>(&sql);
        for version in versions {
            statement = statement.bind(&version.version_id);
        }
        for version in versions {
            statement = statement.bind(&version.document_id);
        }

        statement
            .fetch_all(&self.pool)
            .await
            .map_err(fatal)?
            .into_iter()
            .map(DocumentVersion::try_from)
            .collect()
    }

    /// Lists all versions of a logical document, newest first, tombstones included.
    pub async fn get_document_history(
        &self,
        args: &HistoryQuery,
    ) -> Result<History, DocumentStorageError> {
        let page = args.page.max(1);
        let page_size = self.page_size(args.page_size);

        let collection_filter = match args.collection_id {
            Some(_) => "AND collection_id = $2",
            None => "",
        };
        let first_limit_placeholder = if args.collection_id.is_some() { 3 } else { 2 };

        let count_sql = format!(
            "
            SELECT
                COUNT(*)
            FROM
                document_versions
            WHERE
                document_id = $1
                {}
            ",
            collection_filter
        );

        let mut count_query = query_scalar::<_, i64>(&count_sql).bind(&args.document_id);
        if let Some(collection_id) = &args.collection_id {
            count_query = count_query.bind(collection_id);
        }
        let total = count_query.fetch_one(&self.pool).await.map_err(fatal)? as u64;

        if total == 0 {
            return Err(DocumentStorageError::DocumentNotFound(
                args.document_id.clone(),
            ));
        }

        let select_sql = format!(
            "
            SELECT
                version_id,
                document_id,
                collection_id,
                path,
                event_type,
                status,
                locale,
                is_deleted,
                created_by,
                created_at
            FROM
                document_versions
            WHERE
                document_id = $1
                {}
            ORDER BY
                version_id DESC
            LIMIT
                ${}
            OFFSET
                ${}
            ",
            collection_filter,
            first_limit_placeholder,
            first_limit_placeholder + 1
        );

        let rows = match page_window(page, page_size) {
            Some((limit, offset)) => {
                let mut select_query =
                    query_as::<_, DocumentVersionRow>(&select_sql).bind(&args.document_id);
                if let Some(collection_id) = &args.collection_id {
                    select_query = select_query.bind(collection_id);
                }
                select_query
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(fatal)?
            }
            None => Vec::new(),
        };

        let versions = rows
            .into_iter()
            .map(DocumentVersion::try_from)
            .collect::<Result<Vec<DocumentVersion>, DocumentStorageError>>()?;

        Ok(History {
            versions,
            meta: PageMeta::new(page, page_size, total),
        })
    }
}
