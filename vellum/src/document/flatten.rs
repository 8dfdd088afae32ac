// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use crate::config::Locales;
use crate::document::block_meta::{find_block, BlockElement};
use crate::document::{
    DateTimeValue, FileValue, FlattenError, NumericValue, RelationValue, StoreRow, StoreValue,
};
use crate::path::join_store_path;
use crate::schema::{
    Collection, DateType, FieldDefinition, FieldType, NumberType, StoreKind,
};

/// Flattens a nested document into store rows, one per scalar value and locale.
///
/// Groups contribute their field name to the path, arrays and blocks additionally the element's
/// position, block fields the block type after it (`content.0.hero.heading`). Null and missing
/// values produce no rows.
///
/// Values of non-localized fields are stored under the default locale. Localized fields are
/// either given as a plain value, which is stored under `locale`, or as a `{ locale: value }`
/// map covering several locales at once.
pub fn flatten(
    document: &Value,
    collection: &Collection,
    locales: &Locales,
    locale: &str,
) -> Result<Vec<StoreRow>, FlattenError> {
    let object = document.as_object().ok_or(FlattenError::InvalidValue {
        path: String::new(),
        expected: "object",
    })?;

    if !locales.contains(locale) {
        return Err(FlattenError::UnknownLocale {
            path: String::new(),
            locale: locale.to_string(),
        });
    }

    let mut flattener = Flattener {
        locales,
        locale,
        rows: Vec::new(),
    };
    flattener.flatten_fields(object, collection.fields(), "")?;

    Ok(flattener.rows)
}

struct Flattener<'a> {
    locales: &'a Locales,
    locale: &'a str,
    rows: Vec<StoreRow>,
}

impl<'a> Flattener<'a> {
    fn flatten_fields(
        &mut self,
        object: &Map<String, Value>,
        fields: &[FieldDefinition],
        prefix: &str,
    ) -> Result<(), FlattenError> {
        for field in fields {
            let value = match object.get(&field.name) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };

            let path = join_store_path(prefix, &field.name);
            self.flatten_field(field, value, &path, prefix)?;
        }

        Ok(())
    }

    fn flatten_field(
        &mut self,
        field: &FieldDefinition,
        value: &Value,
        path: &str,
        parent: &str,
    ) -> Result<(), FlattenError> {
        match &field.field_type {
            FieldType::Group { fields } => {
                let object = value.as_object().ok_or_else(|| invalid(path, "object"))?;
                self.flatten_fields(object, fields, path)
            }
            FieldType::Array { fields } => {
                let items = value.as_array().ok_or_else(|| invalid(path, "array"))?;
                for (index, item) in items.iter().enumerate() {
                    let item_path = join_store_path(path, &index.to_string());
                    match item {
                        Value::Null => continue,
                        Value::Object(object) => self.flatten_fields(object, fields, &item_path)?,
                        _ => return Err(invalid(&item_path, "object")),
                    }
                }
                Ok(())
            }
            FieldType::Blocks { blocks } => {
                let items = value.as_array().ok_or_else(|| invalid(path, "array"))?;
                for (index, item) in items.iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }

                    let item_path = join_store_path(path, &index.to_string());
                    let element = BlockElement::parse(item, &item_path)?;
                    let block = find_block(blocks, &element.name, &item_path)?;
                    let block_path = join_store_path(&item_path, &block.name);
                    self.flatten_fields(&element.fields, &block.fields, &block_path)?;
                }
                Ok(())
            }
            _ => self.flatten_leaf(field, value, path, parent),
        }
    }

    /// Splits localized values into their locales before storing them.
    fn flatten_leaf(
        &mut self,
        field: &FieldDefinition,
        value: &Value,
        path: &str,
        parent: &str,
    ) -> Result<(), FlattenError> {
        if !field.is_localized() {
            let locale = self.locales.default_locale().to_owned();
            return self.flatten_leaf_at(field, value, path, parent, &locale);
        }

        match self.locale_map(field, value, path)? {
            Some(map) => {
                for (locale, value) in map {
                    self.flatten_leaf_at(field, value, path, parent, locale)?;
                }
                Ok(())
            }
            None => {
                let locale = self.locale.to_owned();
                self.flatten_leaf_at(field, value, path, parent, &locale)
            }
        }
    }

    /// Returns the value as a locale map if it is one.
    ///
    /// For fields whose plain values are never objects any object is a locale map and all its
    /// keys have to be known locales. Object-valued fields (files, relations, json) are only
    /// treated as a locale map when every key is a known locale.
    fn locale_map<'v>(
        &self,
        field: &FieldDefinition,
        value: &'v Value,
        path: &str,
    ) -> Result<Option<&'v Map<String, Value>>, FlattenError> {
        let map = match value {
            Value::Object(map) => map,
            _ => return Ok(None),
        };

        let object_valued = matches!(
            field.field_type,
            FieldType::Relation {
                has_many: false,
                ..
            }
        ) || matches!(
            field.field_type.store_kind(),
            Some(StoreKind::File) | Some(StoreKind::Json)
        );

        if object_valued {
            let is_locale_map = !map.is_empty() && map.keys().all(|key| self.locales.contains(key));
            return Ok(if is_locale_map { Some(map) } else { None });
        }

        match map.keys().find(|key| !self.locales.contains(key)) {
            Some(unknown) => Err(FlattenError::UnknownLocale {
                path: path.to_string(),
                locale: unknown.to_owned(),
            }),
            None => Ok(Some(map)),
        }
    }

    fn flatten_leaf_at(
        &mut self,
        field: &FieldDefinition,
        value: &Value,
        path: &str,
        parent: &str,
        locale: &str,
    ) -> Result<(), FlattenError> {
        if value.is_null() {
            return Ok(());
        }

        if let FieldType::Relation { has_many: true, .. } = field.field_type {
            let items = value.as_array().ok_or_else(|| invalid(path, "array"))?;
            for (index, item) in items.iter().enumerate() {
                if item.is_null() {
                    continue;
                }

                let item_path = join_store_path(path, &index.to_string());
                let relation = to_relation(item, &item_path)?;
                self.push(field, &item_path, Some(path), locale, relation);
            }
            return Ok(());
        }

        let store_value = to_store_value(field, value, path)?;
        let parent = if parent.is_empty() { None } else { Some(parent) };
        self.push(field, path, parent, locale, store_value);
        Ok(())
    }

    fn push(
        &mut self,
        field: &FieldDefinition,
        path: &str,
        parent: Option<&str>,
        locale: &str,
        value: StoreValue,
    ) {
        self.rows.push(StoreRow {
            field_path: path.to_owned(),
            field_name: field.name.clone(),
            locale: locale.to_owned(),
            parent_path: parent.map(str::to_owned),
            value,
        });
    }
}

fn invalid(path: &str, expected: &'static str) -> FlattenError {
    FlattenError::InvalidValue {
        path: path.to_string(),
        expected,
    }
}

fn to_string_value(value: &Value, path: &str) -> Result<String, FlattenError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid(path, "string"))
}

fn to_relation(value: &Value, path: &str) -> Result<StoreValue, FlattenError> {
    serde_json::from_value::<RelationValue>(value.clone())
        .map(StoreValue::Relation)
        .map_err(|_| invalid(path, "relation object"))
}

fn to_numeric(
    number_type: NumberType,
    value: &Value,
    path: &str,
) -> Result<NumericValue, FlattenError> {
    match number_type {
        NumberType::Integer => {
            if let Some(integer) = value.as_i64() {
                return Ok(NumericValue::Integer(integer));
            }

            match value.as_f64() {
                Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                    Ok(NumericValue::Integer(float as i64))
                }
                _ => Err(invalid(path, "integer")),
            }
        }
        NumberType::Decimal => match value {
            Value::Number(number) => Ok(NumericValue::Decimal(number.to_string())),
            Value::String(text) if text.trim().parse::<f64>().is_ok() => {
                Ok(NumericValue::Decimal(text.trim().to_owned()))
            }
            _ => Err(invalid(path, "decimal number")),
        },
        NumberType::Float => value
            .as_f64()
            .map(NumericValue::Float)
            .ok_or_else(|| invalid(path, "number")),
    }
}

fn to_datetime(
    date_type: DateType,
    value: &Value,
    path: &str,
) -> Result<DateTimeValue, FlattenError> {
    let text = to_string_value(value, path)?;

    let valid = match date_type {
        DateType::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok(),
        DateType::Time => {
            NaiveTime::parse_from_str(&text, "%H:%M:%S%.f").is_ok()
                || NaiveTime::parse_from_str(&text, "%H:%M").is_ok()
        }
        DateType::Timestamp => DateTime::parse_from_rfc3339(&text).is_ok(),
    };

    if !valid {
        return Err(FlattenError::InvalidDateTime {
            path: path.to_string(),
            value: text,
            date_type: date_type.as_str(),
        });
    }

    Ok(match date_type {
        DateType::Date => DateTimeValue::Date(text),
        DateType::Time => DateTimeValue::Time(text),
        DateType::Timestamp => DateTimeValue::Timestamp(text),
    })
}

/// Converts a single scalar value according to its field type.
fn to_store_value(
    field: &FieldDefinition,
    value: &Value,
    path: &str,
) -> Result<StoreValue, FlattenError> {
    match &field.field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Email => {
            Ok(StoreValue::Text(to_string_value(value, path)?))
        }
        FieldType::Select { options } => {
            let text = to_string_value(value, path)?;
            if !options.is_empty() && !options.contains(&text) {
                return Err(FlattenError::InvalidOption {
                    path: path.to_string(),
                    value: text,
                });
            }
            Ok(StoreValue::Text(text))
        }
        FieldType::Number(number_type) => {
            Ok(StoreValue::Numeric(to_numeric(*number_type, value, path)?))
        }
        FieldType::Checkbox => value
            .as_bool()
            .map(StoreValue::Boolean)
            .ok_or_else(|| invalid(path, "boolean")),
        FieldType::Date(date_type) => {
            Ok(StoreValue::DateTime(to_datetime(*date_type, value, path)?))
        }
        FieldType::Upload | FieldType::Image => serde_json::from_value::<FileValue>(value.clone())
            .map(StoreValue::File)
            .map_err(|_| invalid(path, "file object")),
        FieldType::Relation { .. } => to_relation(value, path),
        FieldType::RichText | FieldType::Json => Ok(StoreValue::Json(value.clone())),
        FieldType::Group { .. } | FieldType::Array { .. } | FieldType::Blocks { .. } => {
            Err(invalid(path, "scalar value"))
        }
    }
}
