// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{parse_store_path, PathSegment};
use crate::schema::{FieldDefinition, FieldType, SchemaError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCollection {
    fields: Vec<FieldDefinition>,
}

/// Schema of a collection: the ordered list of its top-level field definitions.
///
/// The storage layer treats the definition passed into each operation as authoritative, it is
/// persisted alongside the collection only to be able to reconstruct documents on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCollection", into = "RawCollection")]
pub struct Collection {
    fields: Vec<FieldDefinition>,
}

impl TryFrom<RawCollection> for Collection {
    type Error = SchemaError;

    fn try_from(raw: RawCollection) -> Result<Self, Self::Error> {
        Collection::new(raw.fields)
    }
}

impl From<Collection> for RawCollection {
    fn from(collection: Collection) -> Self {
        RawCollection {
            fields: collection.fields,
        }
    }
}

fn validate_fields(fields: &[FieldDefinition]) -> Result<(), SchemaError> {
    let mut names = HashSet::new();

    for field in fields {
        let name = field.name.as_str();
        if name.is_empty()
            || name.contains(|c| c == '.' || c == '[' || c == ']')
            || name.parse::<usize>().is_ok()
        {
            return Err(SchemaError::InvalidFieldName(name.to_string()));
        }

        if !names.insert(name) {
            return Err(SchemaError::DuplicateFieldName(name.to_string()));
        }

        match &field.field_type {
            FieldType::Group { fields } | FieldType::Array { fields } => validate_fields(fields)?,
            FieldType::Blocks { blocks } => {
                let mut block_names = HashSet::new();
                for block in blocks {
                    if !block_names.insert(block.name.as_str()) {
                        return Err(SchemaError::DuplicateFieldName(block.name.clone()));
                    }
                    validate_fields(&block.fields)?;
                }
            }
            FieldType::Relation { has_many: true, .. } if field.localized => {
                return Err(SchemaError::LocalizedHasMany(name.to_string()));
            }
            _ => (),
        }
    }

    Ok(())
}

/// Skips the positional segment following an array-like field, returns `None` if the next
/// segment does not address an element.
fn skip_position(segments: &[PathSegment]) -> Option<&[PathSegment]> {
    let (position, rest) = segments.split_first()?;
    if position.is_position() {
        Some(rest)
    } else {
        None
    }
}

fn resolve_in<'a>(
    fields: &'a [FieldDefinition],
    segments: &[PathSegment],
) -> Option<&'a FieldDefinition> {
    let (first, rest) = segments.split_first()?;
    let name = first.as_field()?;
    let field = fields.iter().find(|field| field.name == name)?;

    if rest.is_empty() {
        return Some(field);
    }

    match &field.field_type {
        FieldType::Group { fields } => resolve_in(fields, rest),
        FieldType::Array { fields } => {
            let rest = skip_position(rest)?;
            if rest.is_empty() {
                Some(field)
            } else {
                resolve_in(fields, rest)
            }
        }
        FieldType::Blocks { blocks } => {
            let rest = skip_position(rest)?;
            let (block_name, rest) = match rest.split_first() {
                Some(split) => split,
                None => return Some(field),
            };
            let block = blocks
                .iter()
                .find(|block| Some(block.name.as_str()) == block_name.as_field())?;
            if rest.is_empty() {
                Some(field)
            } else {
                resolve_in(&block.fields, rest)
            }
        }
        FieldType::Relation { has_many: true, .. } => match skip_position(rest)? {
            [] => Some(field),
            _ => None,
        },
        _ => None,
    }
}

impl Collection {
    /// Returns a validated collection schema.
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        validate_fields(&fields)?;
        Ok(Self { fields })
    }

    /// Parses a collection config, `{ "fields": [...] }`.
    pub fn from_json(config: &Value) -> Result<Self, SchemaError> {
        serde_json::from_value(config.clone()).map_err(|err| {
            // Keep our own error when it was raised while converting a field definition
            let message = err.to_string();
            match message.strip_prefix("Unsupported field type '") {
                Some(rest) => SchemaError::UnsupportedFieldType(
                    rest.split('\'').next().unwrap_or_default().to_string(),
                ),
                None => SchemaError::Malformed(message),
            }
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({ "fields": self.fields })
    }

    /// Top-level field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Resolves a sequence of path segments to the field definition it addresses.
    ///
    /// Positional segments (indices, ids or numeric names) are expected after array, blocks and
    /// has-many relation fields, block paths additionally carry the block name after the
    /// position.
    pub fn resolve(&self, segments: &[PathSegment]) -> Option<&FieldDefinition> {
        resolve_in(&self.fields, segments)
    }

    /// Resolves a flattened store path like `content.0.hero.title`.
    pub fn resolve_path(&self, field_path: &str) -> Option<&FieldDefinition> {
        self.resolve(&parse_store_path(field_path))
    }
}
