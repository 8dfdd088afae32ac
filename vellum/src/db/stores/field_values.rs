// SPDX-License-Identifier: AGPL-3.0-or-later

//! Writing store rows into their typed tables and reading them back with one fan-in query.
use log::debug;
use sqlx::any::AnyConnection;
use sqlx::{query, query_as};
use uuid::Uuid;

use crate::db::errors::DocumentStorageError;
use crate::db::models::FieldValueRow;
use crate::db::types::StoredRow;
use crate::db::{placeholders, SqlStore};
use crate::document::{DateTimeValue, LocaleFilter, NumericValue, StoreRow, StoreValue};
use crate::schema::StoreKind;

/// Columns every store table shares.
const COMMON_COLUMNS: &str =
    "id, document_version_id, collection_id, field_path, field_name, locale, parent_path";

/// Value columns of the fan-in result with the SQL type they are `NULL`-padded with.
const UNION_COLUMNS: [(&str, &str); 24] = [
    ("value_text", "TEXT"),
    ("number_type", "TEXT"),
    ("value_integer", "BIGINT"),
    ("value_decimal", "TEXT"),
    ("value_float", "DOUBLE PRECISION"),
    ("value_boolean", "BOOLEAN"),
    ("date_type", "TEXT"),
    ("value_date", "TEXT"),
    ("value_time", "TEXT"),
    ("value_timestamp", "TEXT"),
    ("file_id", "TEXT"),
    ("filename", "TEXT"),
    ("mime_type", "TEXT"),
    ("file_size", "BIGINT"),
    ("storage_provider", "TEXT"),
    ("storage_path", "TEXT"),
    ("image_width", "BIGINT"),
    ("image_height", "BIGINT"),
    ("processing_status", "TEXT"),
    ("target_document_id", "TEXT"),
    ("target_collection_id", "TEXT"),
    ("relationship_type", "TEXT"),
    ("cascade_delete", "BOOLEAN"),
    ("value_json", "TEXT"),
];

/// Value columns of a store table, paired with the fan-in column they are projected to.
fn value_columns(kind: StoreKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        StoreKind::Text => &[("value", "value_text")],
        StoreKind::Numeric => &[
            ("number_type", "number_type"),
            ("value_integer", "value_integer"),
            ("value_decimal", "value_decimal"),
            ("value_float", "value_float"),
        ],
        StoreKind::Boolean => &[("value", "value_boolean")],
        StoreKind::DateTime => &[
            ("date_type", "date_type"),
            ("value_date", "value_date"),
            ("value_time", "value_time"),
            ("value_timestamp_tz", "value_timestamp"),
        ],
        StoreKind::File => &[
            ("file_id", "file_id"),
            ("filename", "filename"),
            ("mime_type", "mime_type"),
            ("file_size", "file_size"),
            ("storage_provider", "storage_provider"),
            ("storage_path", "storage_path"),
            ("image_width", "image_width"),
            ("image_height", "image_height"),
            ("processing_status", "processing_status"),
        ],
        StoreKind::Relation => &[
            ("target_document_id", "target_document_id"),
            ("target_collection_id", "target_collection_id"),
            ("relationship_type", "relationship_type"),
            ("cascade_delete", "cascade_delete"),
        ],
        StoreKind::Json => &[("value", "value_json")],
    }
}

/// One `SELECT` of the fan-in union, projecting the table onto the shared column list.
fn union_branch(kind: StoreKind, version_filter: &str, locale_filter: Option<&str>) -> String {
    let columns = value_columns(kind);

    let projection = UNION_COLUMNS
        .iter()
        .map(|(union_column, sql_type)| {
            match columns.iter().find(|(_, projected)| projected == union_column) {
                Some((column, _)) => format!("{} AS {}", column, union_column),
                None => format!("CAST(NULL AS {}) AS {}", sql_type, union_column),
            }
        })
        .collect::<Vec<String>>()
        .join(", ");

    let locale_clause = locale_filter
        .map(|locales| format!(" AND locale IN ({})", locales))
        .unwrap_or_default();

    format!(
        "SELECT {}, '{}' AS field_type, {} FROM {} WHERE document_version_id IN ({}){}",
        COMMON_COLUMNS,
        kind.as_str(),
        projection,
        kind.table_name(),
        version_filter,
        locale_clause
    )
}

/// Builds the fan-in query over all store tables.
///
/// Version ids are bound to `$1..$n`, locales to the following placeholders. Every branch
/// reuses the same placeholders. Rows of one version, path and locale come out contiguous.
pub(crate) fn fan_in_query(version_count: usize, locale_count: usize) -> String {
    let version_filter = placeholders(1, version_count);
    let locale_filter = (locale_count > 0).then(|| placeholders(version_count + 1, locale_count));

    let branches = StoreKind::ALL
        .iter()
        .map(|kind| union_branch(*kind, &version_filter, locale_filter.as_deref()))
        .collect::<Vec<String>>()
        .join(" UNION ALL ");

    format!(
        "{} ORDER BY document_version_id, field_path, locale",
        branches
    )
}

/// Inserts one store row into the table of its kind.
pub(crate) async fn insert_store_row(
    connection: &mut AnyConnection,
    document_version_id: &str,
    collection_id: &str,
    row: &StoreRow,
) -> Result<(), sqlx::Error> {
    let kind = row.kind();
    let columns = value_columns(kind);

    let sql = format!(
        "INSERT INTO {} ({}, {}) VALUES ({})",
        kind.table_name(),
        COMMON_COLUMNS,
        columns
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<&str>>()
            .join(", "),
        placeholders(1, 7 + columns.len())
    );

    let statement = query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(document_version_id)
        .bind(collection_id)
        .bind(&row.field_path)
        .bind(&row.field_name)
        .bind(&row.locale)
        .bind(&row.parent_path);

    let statement = match &row.value {
        StoreValue::Text(value) => statement.bind(value),
        StoreValue::Numeric(numeric) => {
            let statement = statement.bind(numeric.number_type().as_str());
            match numeric {
                NumericValue::Integer(value) => statement
                    .bind(Some(*value))
                    .bind(None::<String>)
                    .bind(None::<f64>),
                NumericValue::Decimal(value) => statement
                    .bind(None::<i64>)
                    .bind(Some(value))
                    .bind(None::<f64>),
                NumericValue::Float(value) => statement
                    .bind(None::<i64>)
                    .bind(None::<String>)
                    .bind(Some(*value)),
            }
        }
        StoreValue::Boolean(value) => statement.bind(*value),
        StoreValue::DateTime(datetime) => {
            let statement = statement.bind(datetime.date_type().as_str());
            let (date, time, timestamp) = match datetime {
                DateTimeValue::Date(value) => (Some(value), None, None),
                DateTimeValue::Time(value) => (None, Some(value), None),
                DateTimeValue::Timestamp(value) => (None, None, Some(value)),
            };
            statement.bind(date).bind(time).bind(timestamp)
        }
        StoreValue::File(file) => statement
            .bind(&file.file_id)
            .bind(&file.filename)
            .bind(&file.mime_type)
            .bind(file.file_size)
            .bind(&file.storage_provider)
            .bind(&file.storage_path)
            .bind(file.image_width)
            .bind(file.image_height)
            .bind(&file.processing_status),
        StoreValue::Relation(relation) => statement
            .bind(&relation.target_document_id)
            .bind(&relation.target_collection_id)
            .bind(&relation.relationship_type)
            .bind(relation.cascade_delete),
        StoreValue::Json(value) => statement.bind(value.to_string()),
    };

    statement.execute(connection).await?;

    Ok(())
}

impl SqlStore {
    /// Returns every store row of one document version across all typed tables.
    pub async fn get_all_field_values(
        &self,
        version_id: &str,
        locale: &LocaleFilter,
    ) -> Result<Vec<StoredRow>, DocumentStorageError> {
        self.get_field_values(&[version_id.to_string()], locale)
            .await
    }

    /// Returns the store rows of many document versions with a single query.
    ///
    /// With a specific locale only rows of that locale and of the default locale are loaded.
    pub async fn get_field_values(
        &self,
        version_ids: &[String],
        locale: &LocaleFilter,
    ) -> Result<Vec<StoredRow>, DocumentStorageError> {
        if version_ids.is_empty() {
            return Ok(Vec::new());
        }

        let locales = locale.locales_to_load(&self.locales).unwrap_or_default();
        let sql = fan_in_query(version_ids.len(), locales.len());

        let mut statement = query_as::<_, FieldValueRow>(&sql);
        for version_id in version_ids {
            statement = statement.bind(version_id);
        }
        for locale in &locales {
            statement = statement.bind(locale);
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DocumentStorageError::FatalStorageError(err.to_string()))?;

        debug!(
            "Loaded {} field values for {} document versions",
            rows.len(),
            version_ids.len()
        );

        rows.into_iter().map(StoredRow::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use crate::db::traits::{CollectionStore, DocumentStore};
    use crate::db::types::CreateVersionParams;
    use crate::db::SqlStore;
    use crate::document::{LocaleFilter, NumericValue, StoreValue};
    use crate::schema::StoreKind;
    use crate::test_utils::{article_collection, test_runner};

    use super::{fan_in_query, union_branch};

    #[test]
    fn branch_pads_foreign_columns() {
        let branch = union_branch(StoreKind::Boolean, "$1", Some("$2, $3"));

        assert!(branch.starts_with("SELECT id, document_version_id"));
        assert!(branch.contains("'boolean' AS field_type"));
        assert!(branch.contains("value AS value_boolean"));
        assert!(branch.contains("CAST(NULL AS TEXT) AS value_text"));
        assert!(branch.contains("CAST(NULL AS DOUBLE PRECISION) AS value_float"));
        assert!(branch.contains("FROM store_boolean"));
        assert!(branch.ends_with("WHERE document_version_id IN ($1) AND locale IN ($2, $3)"));
    }

    #[test]
    fn query_covers_all_tables() {
        let sql = fan_in_query(2, 0);

        assert_eq!(sql.matches(" UNION ALL ").count(), 6);
        assert_eq!(sql.matches("document_version_id IN ($1, $2)").count(), 7);
        assert!(!sql.contains("locale IN"));
        assert!(sql.ends_with("ORDER BY document_version_id, field_path, locale"));
    }

    #[test]
    fn one_row_per_store_kind() {
        test_runner(|store: SqlStore| async move {
            let collection = article_collection();
            let articles = store
                .create_collection("articles", &collection)
                .await
                .unwrap();

            let document = json!({
                "slug": "one-of-each",
                "views": 7,
                "published": true,
                "publishedOn": "2024-05-01",
                "cover": { "filename": "cover.png", "mimeType": "image/png" },
                "category": { "targetDocumentId": "c1", "cascadeDelete": true },
                "metadata": { "tags": ["a", "b"] }
            });

            let created = store
                .create_document_version(&CreateVersionParams::new(
                    &articles.collection_id,
                    &collection,
                    document,
                ))
                .await
                .unwrap();
            assert_eq!(created.field_count, 7);

            let rows = store
                .get_all_field_values(&created.version.version_id, &LocaleFilter::All)
                .await
                .unwrap();
            assert_eq!(rows.len(), 7);

            let kinds: HashSet<StoreKind> = rows.iter().map(|row| row.row.kind()).collect();
            assert_eq!(kinds.len(), 7);

            let views = rows
                .iter()
                .find(|row| row.row.field_path == "views")
                .unwrap();
            assert_eq!(
                views.row.value,
                StoreValue::Numeric(NumericValue::Integer(7))
            );
            assert_eq!(views.document_version_id, created.version.version_id);
            assert_eq!(views.collection_id, articles.collection_id);

            // Sorted by path
            let paths: Vec<&str> = rows.iter().map(|row| row.row.field_path.as_str()).collect();
            let mut sorted = paths.clone();
            sorted.sort();
            assert_eq!(paths, sorted);
        });
    }

    #[test]
    fn locale_filter_is_pushed_into_query() {
        test_runner(|store: SqlStore| async move {
            let collection = article_collection();
            let articles = store
                .create_collection("articles", &collection)
                .await
                .unwrap();

            let created = store
                .create_document_version(&CreateVersionParams::new(
                    &articles.collection_id,
                    &collection,
                    json!({ "title": { "en": "Hello", "es": "Hola" }, "slug": "hello" }),
                ))
                .await
                .unwrap();
            let version_id = created.version.version_id;

            let all = store
                .get_all_field_values(&version_id, &LocaleFilter::All)
                .await
                .unwrap();
            assert_eq!(all.len(), 3);

            // Spanish plus the default locale
            let spanish = store
                .get_all_field_values(&version_id, &LocaleFilter::Locale("es".into()))
                .await
                .unwrap();
            assert_eq!(spanish.len(), 3);

            let english = store
                .get_all_field_values(&version_id, &LocaleFilter::Locale("en".into()))
                .await
                .unwrap();
            assert_eq!(english.len(), 2);
            assert!(english.iter().all(|row| row.row.locale == "en"));
        });
    }

    #[test]
    fn batch_of_versions() {
        test_runner(|store: SqlStore| async move {
            let collection = article_collection();
            let articles = store
                .create_collection("articles", &collection)
                .await
                .unwrap();

            let mut version_ids = Vec::new();
            for slug in ["first", "second"] {
                let created = store
                    .create_document_version(&CreateVersionParams::new(
                        &articles.collection_id,
                        &collection,
                        json!({ "slug": slug, "views": 1 }),
                    ))
                    .await
                    .unwrap();
                version_ids.push(created.version.version_id);
            }

            let rows = store
                .get_field_values(&version_ids, &LocaleFilter::All)
                .await
                .unwrap();
            assert_eq!(rows.len(), 4);
            for version_id in &version_ids {
                assert_eq!(
                    rows.iter()
                        .filter(|row| &row.document_version_id == version_id)
                        .count(),
                    2
                );
            }

            assert!(store
                .get_field_values(&[], &LocaleFilter::All)
                .await
                .unwrap()
                .is_empty());
        });
    }
}
