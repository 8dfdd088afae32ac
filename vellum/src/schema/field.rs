// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaError;

/// The seven scalar kinds values are persisted as, one typed table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    Text,
    Numeric,
    Boolean,
    DateTime,
    File,
    Relation,
    Json,
}

impl StoreKind {
    /// All store kinds in the order their tables appear in fan-in queries.
    pub const ALL: [StoreKind; 7] = [
        StoreKind::Text,
        StoreKind::Numeric,
        StoreKind::Boolean,
        StoreKind::DateTime,
        StoreKind::File,
        StoreKind::Relation,
        StoreKind::Json,
    ];

    /// Discriminant string tagging rows of this kind in fan-in results.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Text => "text",
            StoreKind::Numeric => "numeric",
            StoreKind::Boolean => "boolean",
            StoreKind::DateTime => "datetime",
            StoreKind::File => "file",
            StoreKind::Relation => "relation",
            StoreKind::Json => "json",
        }
    }

    /// Name of the SQL table holding values of this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            StoreKind::Text => "store_text",
            StoreKind::Numeric => "store_numeric",
            StoreKind::Boolean => "store_boolean",
            StoreKind::DateTime => "store_datetime",
            StoreKind::File => "store_file",
            StoreKind::Relation => "store_relation",
            StoreKind::Json => "store_json",
        }
    }
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Physical column a numeric value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberType {
    Integer,
    Decimal,
    Float,
}

impl NumberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberType::Integer => "integer",
            NumberType::Decimal => "decimal",
            NumberType::Float => "float",
        }
    }
}

impl FromStr for NumberType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(NumberType::Integer),
            "decimal" => Ok(NumberType::Decimal),
            "float" => Ok(NumberType::Float),
            _ => Err(SchemaError::InvalidNumberType(s.to_string())),
        }
    }
}

/// Physical column a datetime value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateType {
    Date,
    Time,
    Timestamp,
}

impl DateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateType::Date => "date",
            DateType::Time => "time",
            DateType::Timestamp => "timestamp",
        }
    }
}

impl FromStr for DateType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(DateType::Date),
            "time" => Ok(DateType::Time),
            "timestamp" => Ok(DateType::Timestamp),
            _ => Err(SchemaError::InvalidDateType(s.to_string())),
        }
    }
}

/// One named block variant inside a blocks field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

/// Type of a field, a closed set so every conversion site has to handle each case.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Select { options: Vec<String> },
    Number(NumberType),
    Checkbox,
    Date(DateType),
    Upload,
    Image,
    Relation {
        relation_to: Option<String>,
        has_many: bool,
    },
    RichText,
    Json,
    Group { fields: Vec<FieldDefinition> },
    Array { fields: Vec<FieldDefinition> },
    Blocks { blocks: Vec<BlockDefinition> },
}

impl FieldType {
    /// Returns the store kind scalar values of this type are persisted as, `None` for container
    /// types which only hold other fields.
    pub fn store_kind(&self) -> Option<StoreKind> {
        match self {
            FieldType::Text | FieldType::Textarea | FieldType::Email | FieldType::Select { .. } => {
                Some(StoreKind::Text)
            }
            FieldType::Number(_) => Some(StoreKind::Numeric),
            FieldType::Checkbox => Some(StoreKind::Boolean),
            FieldType::Date(_) => Some(StoreKind::DateTime),
            FieldType::Upload | FieldType::Image => Some(StoreKind::File),
            FieldType::Relation { .. } => Some(StoreKind::Relation),
            FieldType::RichText | FieldType::Json => Some(StoreKind::Json),
            FieldType::Group { .. } | FieldType::Array { .. } | FieldType::Blocks { .. } => None,
        }
    }

    /// Name of this type as it appears in collection configs.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Select { .. } => "select",
            FieldType::Number(_) => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Date(_) => "date",
            FieldType::Upload => "upload",
            FieldType::Image => "image",
            FieldType::Relation { .. } => "relation",
            FieldType::RichText => "richText",
            FieldType::Json => "json",
            FieldType::Group { .. } => "group",
            FieldType::Array { .. } => "array",
            FieldType::Blocks { .. } => "blocks",
        }
    }
}

/// Definition of a single field inside a collection, group, array or block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDefinition", into = "RawFieldDefinition")]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub localized: bool,
}

impl FieldDefinition {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            unique: false,
            localized: false,
        }
    }

    /// Marks this field as carrying one value per locale.
    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns true if the field carries per-locale values. Only scalar fields can be localized,
    /// the flag is ignored on containers.
    pub fn is_localized(&self) -> bool {
        self.localized && self.field_type.store_kind().is_some()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire representation of a field definition as found in collection config JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldDefinition {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    localized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation_to: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    has_many: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<BlockDefinition>>,
}

impl TryFrom<RawFieldDefinition> for FieldDefinition {
    type Error = SchemaError;

    fn try_from(raw: RawFieldDefinition) -> Result<Self, Self::Error> {
        let field_type = match raw.field_type.as_str() {
            "text" => FieldType::Text,
            "textarea" | "textArea" => FieldType::Textarea,
            "email" => FieldType::Email,
            "select" => FieldType::Select {
                options: raw.options.unwrap_or_default(),
            },
            "number" => FieldType::Number(match raw.number_type.as_deref() {
                Some(number_type) => number_type.parse()?,
                None => NumberType::Float,
            }),
            "checkbox" | "boolean" => FieldType::Checkbox,
            "date" => FieldType::Date(match raw.date_type.as_deref() {
                Some(date_type) => date_type.parse()?,
                None => DateType::Timestamp,
            }),
            "upload" | "file" => FieldType::Upload,
            "image" => FieldType::Image,
            "relation" | "relationship" => FieldType::Relation {
                relation_to: raw.relation_to,
                has_many: raw.has_many,
            },
            "richText" | "richtext" => FieldType::RichText,
            "json" => FieldType::Json,
            "group" => FieldType::Group {
                fields: raw.fields.unwrap_or_default(),
            },
            "array" => FieldType::Array {
                fields: raw.fields.unwrap_or_default(),
            },
            "blocks" => {
                let blocks = raw.blocks.unwrap_or_default();
                if blocks.is_empty() {
                    return Err(SchemaError::EmptyBlocks(raw.name));
                }
                FieldType::Blocks { blocks }
            }
            unsupported => return Err(SchemaError::UnsupportedFieldType(unsupported.to_string())),
        };

        Ok(FieldDefinition {
            name: raw.name,
            field_type,
            required: raw.required,
            unique: raw.unique,
            localized: raw.localized,
        })
    }
}

impl From<FieldDefinition> for RawFieldDefinition {
    fn from(definition: FieldDefinition) -> Self {
        let mut raw = RawFieldDefinition {
            name: definition.name,
            field_type: definition.field_type.type_name().to_string(),
            required: definition.required,
            unique: definition.unique,
            localized: definition.localized,
            number_type: None,
            date_type: None,
            options: None,
            relation_to: None,
            has_many: false,
            fields: None,
            blocks: None,
        };

        match definition.field_type {
            FieldType::Select { options } => raw.options = Some(options),
            FieldType::Number(number_type) => raw.number_type = Some(number_type.as_str().into()),
            FieldType::Date(date_type) => raw.date_type = Some(date_type.as_str().into()),
            FieldType::Relation {
                relation_to,
                has_many,
            } => {
                raw.relation_to = relation_to;
                raw.has_many = has_many;
            }
            FieldType::Group { fields } | FieldType::Array { fields } => raw.fields = Some(fields),
            FieldType::Blocks { blocks } => raw.blocks = Some(blocks),
            _ => (),
        }

        raw
    }
}
