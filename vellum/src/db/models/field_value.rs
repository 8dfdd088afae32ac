// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

use crate::db::errors::DocumentStorageError;
use crate::db::types::StoredRow;
use crate::document::{
    DateTimeValue, FileValue, NumericValue, RelationValue, StoreRow, StoreValue,
};
use crate::schema::{DateType, NumberType, StoreKind};

/// One row of the `UNION ALL` over all typed store tables.
///
/// Every table contributes the shared columns plus its own value columns, all other value
/// columns are `NULL`. The `field_type` discriminant names the table the row came from.
#[derive(FromRow, Debug, Clone, Default)]
pub struct FieldValueRow {
    pub id: String,
    pub document_version_id: String,
    pub collection_id: String,
    pub field_path: String,
    pub field_name: String,
    pub locale: String,
    pub parent_path: Option<String>,
    pub field_type: String,

    pub value_text: Option<String>,

    pub number_type: Option<String>,
    pub value_integer: Option<i64>,
    pub value_decimal: Option<String>,
    pub value_float: Option<f64>,

    pub value_boolean: Option<bool>,

    pub date_type: Option<String>,
    pub value_date: Option<String>,
    pub value_time: Option<String>,
    pub value_timestamp: Option<String>,

    pub file_id: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub storage_provider: Option<String>,
    pub storage_path: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub processing_status: Option<String>,

    pub target_document_id: Option<String>,
    pub target_collection_id: Option<String>,
    pub relationship_type: Option<String>,
    pub cascade_delete: Option<bool>,

    pub value_json: Option<String>,
}

impl FieldValueRow {
    fn invalid(&self, kind: StoreKind) -> DocumentStorageError {
        DocumentStorageError::InvalidStoredValue {
            path: self.field_path.clone(),
            kind: kind.as_str(),
        }
    }

    fn store_value(&self) -> Result<StoreValue, DocumentStorageError> {
        let kind: StoreKind = self
            .field_type
            .parse()
            .map_err(|_| DocumentStorageError::UnknownFieldType(self.field_type.clone()))?;

        let required = |value: Option<String>| value.ok_or_else(|| self.invalid(kind));

        let value = match kind {
            StoreKind::Text => StoreValue::Text(required(self.value_text.clone())?),
            StoreKind::Numeric => {
                let number_type: NumberType = required(self.number_type.clone())?.parse()?;
                let numeric = match number_type {
                    NumberType::Integer => self.value_integer.map(NumericValue::Integer),
                    NumberType::Decimal => self.value_decimal.clone().map(NumericValue::Decimal),
                    NumberType::Float => self.value_float.map(NumericValue::Float),
                };
                StoreValue::Numeric(numeric.ok_or_else(|| self.invalid(kind))?)
            }
            StoreKind::Boolean => {
                StoreValue::Boolean(self.value_boolean.ok_or_else(|| self.invalid(kind))?)
            }
            StoreKind::DateTime => {
                let date_type: DateType = required(self.date_type.clone())?.parse()?;
                let datetime = match date_type {
                    DateType::Date => self.value_date.clone().map(DateTimeValue::Date),
                    DateType::Time => self.value_time.clone().map(DateTimeValue::Time),
                    DateType::Timestamp => {
                        self.value_timestamp.clone().map(DateTimeValue::Timestamp)
                    }
                };
                StoreValue::DateTime(datetime.ok_or_else(|| self.invalid(kind))?)
            }
            StoreKind::File => StoreValue::File(FileValue {
                file_id: self.file_id.clone(),
                filename: required(self.filename.clone())?,
                mime_type: required(self.mime_type.clone())?,
                file_size: self.file_size,
                storage_provider: self.storage_provider.clone(),
                storage_path: self.storage_path.clone(),
                image_width: self.image_width,
                image_height: self.image_height,
                processing_status: self.processing_status.clone(),
            }),
            StoreKind::Relation => StoreValue::Relation(RelationValue {
                target_document_id: required(self.target_document_id.clone())?,
                target_collection_id: self.target_collection_id.clone(),
                relationship_type: self.relationship_type.clone(),
                cascade_delete: self.cascade_delete,
            }),
            StoreKind::Json => {
                let json = required(self.value_json.clone())?;
                StoreValue::Json(serde_json::from_str(&json).map_err(|_| self.invalid(kind))?)
            }
        };

        Ok(value)
    }
}

impl TryFrom<FieldValueRow> for StoredRow {
    type Error = DocumentStorageError;

    fn try_from(row: FieldValueRow) -> Result<Self, Self::Error> {
        let value = row.store_value()?;

        Ok(StoredRow {
            id: row.id,
            document_version_id: row.document_version_id,
            collection_id: row.collection_id,
            row: StoreRow {
                field_path: row.field_path,
                field_name: row.field_name,
                locale: row.locale,
                parent_path: row.parent_path,
                value,
            },
        })
    }
}
