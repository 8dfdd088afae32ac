// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::schema::{DateType, NumberType, StoreKind};

/// One scalar value flattened out of a document, addressed by its dotted field path and locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRow {
    /// Position of the value in the nested document, for example `images.0.alt`.
    pub field_path: String,

    /// Name of the field definition this value belongs to.
    pub field_name: String,

    pub locale: String,

    /// Path of the containing object or array, `None` for top-level fields.
    pub parent_path: Option<String>,

    pub value: StoreValue,
}

impl StoreRow {
    pub fn kind(&self) -> StoreKind {
        self.value.kind()
    }
}

/// A stored value, one variant per typed store table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field_type", content = "value", rename_all = "lowercase")]
pub enum StoreValue {
    Text(String),
    Numeric(NumericValue),
    Boolean(bool),
    DateTime(DateTimeValue),
    File(FileValue),
    Relation(RelationValue),
    Json(Value),
}

impl StoreValue {
    pub fn kind(&self) -> StoreKind {
        match self {
            StoreValue::Text(_) => StoreKind::Text,
            StoreValue::Numeric(_) => StoreKind::Numeric,
            StoreValue::Boolean(_) => StoreKind::Boolean,
            StoreValue::DateTime(_) => StoreKind::DateTime,
            StoreValue::File(_) => StoreKind::File,
            StoreValue::Relation(_) => StoreKind::Relation,
            StoreValue::Json(_) => StoreKind::Json,
        }
    }

    /// Converts the stored value back into its document representation.
    pub fn to_json(&self) -> Value {
        match self {
            StoreValue::Text(text) => Value::String(text.to_owned()),
            StoreValue::Numeric(numeric) => numeric.to_json(),
            StoreValue::Boolean(value) => Value::Bool(*value),
            StoreValue::DateTime(datetime) => Value::String(datetime.as_str().to_owned()),
            StoreValue::File(file) => file.to_json(),
            StoreValue::Relation(relation) => relation.to_json(),
            StoreValue::Json(value) => value.to_owned(),
        }
    }
}

/// Numeric value tagged with the column it is stored in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "number_type", content = "value", rename_all = "lowercase")]
pub enum NumericValue {
    Integer(i64),

    /// Decimals are kept in their textual form to not lose precision.
    Decimal(String),

    Float(f64),
}

impl NumericValue {
    pub fn number_type(&self) -> NumberType {
        match self {
            NumericValue::Integer(_) => NumberType::Integer,
            NumericValue::Decimal(_) => NumberType::Decimal,
            NumericValue::Float(_) => NumberType::Float,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            NumericValue::Integer(value) => Value::Number((*value).into()),
            NumericValue::Decimal(value) => match value.parse::<Number>() {
                Ok(number) => Value::Number(number),
                Err(_) => Value::String(value.to_owned()),
            },
            NumericValue::Float(value) => {
                // Integral floats come back as integers, documents do not distinguish the two
                if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                    Value::Number((*value as i64).into())
                } else {
                    Number::from_f64(*value).map_or(Value::Null, Value::Number)
                }
            }
        }
    }
}

/// Datetime value in its ISO 8601 / RFC 3339 text form, tagged with the column it is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "date_type", content = "value", rename_all = "lowercase")]
pub enum DateTimeValue {
    Date(String),
    Time(String),
    Timestamp(String),
}

impl DateTimeValue {
    pub fn date_type(&self) -> DateType {
        match self {
            DateTimeValue::Date(_) => DateType::Date,
            DateTimeValue::Time(_) => DateType::Time,
            DateTimeValue::Timestamp(_) => DateType::Timestamp,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DateTimeValue::Date(value)
            | DateTimeValue::Time(value)
            | DateTimeValue::Timestamp(value) => value,
        }
    }
}

/// Composite metadata of an uploaded file or image, always stored as a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub filename: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<String>,
}

impl FileValue {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        insert_some(&mut map, "fileId", self.file_id.clone().map(Value::String));
        map.insert("filename".into(), Value::String(self.filename.clone()));
        map.insert("mimeType".into(), Value::String(self.mime_type.clone()));
        insert_some(&mut map, "fileSize", self.file_size.map(Value::from));
        insert_some(
            &mut map,
            "storageProvider",
            self.storage_provider.clone().map(Value::String),
        );
        insert_some(
            &mut map,
            "storagePath",
            self.storage_path.clone().map(Value::String),
        );
        insert_some(&mut map, "imageWidth", self.image_width.map(Value::from));
        insert_some(&mut map, "imageHeight", self.image_height.map(Value::from));
        insert_some(
            &mut map,
            "processingStatus",
            self.processing_status.clone().map(Value::String),
        );
        Value::Object(map)
    }
}

/// Reference to another logical document. Relations always resolve to the target's current
/// version, never to a pinned one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationValue {
    pub target_document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascade_delete: Option<bool>,
}

impl RelationValue {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "targetDocumentId".into(),
            Value::String(self.target_document_id.clone()),
        );
        insert_some(
            &mut map,
            "targetCollectionId",
            self.target_collection_id.clone().map(Value::String),
        );
        insert_some(
            &mut map,
            "relationshipType",
            self.relationship_type.clone().map(Value::String),
        );
        insert_some(&mut map, "cascadeDelete", self.cascade_delete.map(Value::Bool));
        Value::Object(map)
    }
}

fn insert_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}
