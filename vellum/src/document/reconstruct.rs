// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::BTreeMap;

use log::warn;
use serde_json::{Map, Value};

use crate::config::Locales;
use crate::document::{
    attach_block_meta, BlockMeta, LocaleFilter, ReconstructError, StoreRow,
};
use crate::path::{ensure_path, parse_store_path, Key, PathError};
use crate::schema::{Collection, FieldDefinition};

/// Rebuilds the nested document tree from its store rows.
///
/// Rows are grouped by field path and each group is reduced to one value according to the
/// locale filter. With [`LocaleFilter::All`] localized fields, and any path stored under more
/// than one locale, come back as `{ locale: value }` maps. With a specific locale the requested
/// locale is picked, falling back to the default locale and finally to any stored one.
///
/// Intermediate objects and arrays are created on the fly, array gaps are filled with nulls.
/// Rows whose path does not resolve against the collection are skipped.
///
/// Blocks fields come back as `{ <block type>: { ..fields } }` elements, see
/// [`reconstruct_document`] to attach their identity as well.
pub fn reconstruct(
    rows: &[StoreRow],
    collection: &Collection,
    locales: &Locales,
    filter: &LocaleFilter,
) -> Result<Value, ReconstructError> {
    let mut groups: BTreeMap<&str, Vec<&StoreRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.field_path.as_str()).or_default().push(row);
    }

    let mut document = Value::Object(Map::new());

    for (path, group) in groups {
        let field = match collection.resolve_path(path) {
            Some(field) => field,
            None => {
                warn!("Skipping store row with unknown field path '{}'", path);
                continue;
            }
        };

        let value = match select_value(&group, field, locales, filter) {
            Some(value) => value,
            None => continue,
        };

        let segments = parse_store_path(path);
        let to_error = |source: PathError| ReconstructError::Path {
            path: path.to_string(),
            source,
        };

        let (parent, key) = ensure_path(&mut document, &segments).map_err(to_error)?;
        assign(parent, key, value).map_err(to_error)?;
    }

    Ok(document)
}

/// Rebuilds the full document, including id, type and meta of every block element.
pub fn reconstruct_document(
    rows: &[StoreRow],
    block_meta: &[BlockMeta],
    collection: &Collection,
    locales: &Locales,
    filter: &LocaleFilter,
) -> Result<Value, ReconstructError> {
    let mut document = reconstruct(rows, collection, locales, filter)?;
    attach_block_meta(&mut document, collection, block_meta);
    Ok(document)
}

fn select_value(
    group: &[&StoreRow],
    field: &FieldDefinition,
    locales: &Locales,
    filter: &LocaleFilter,
) -> Option<Value> {
    match filter {
        LocaleFilter::All => {
            let multiple_locales = group.iter().any(|row| row.locale != group[0].locale);
            if field.is_localized() || multiple_locales {
                let map = group
                    .iter()
                    .map(|row| (row.locale.clone(), row.value.to_json()))
                    .collect();
                Some(Value::Object(map))
            } else {
                group.first().map(|row| row.value.to_json())
            }
        }
        LocaleFilter::Locale(locale) => group
            .iter()
            .find(|row| &row.locale == locale)
            .or_else(|| {
                group
                    .iter()
                    .find(|row| row.locale == locales.default_locale())
            })
            .or_else(|| group.first())
            .map(|row| row.value.to_json()),
    }
}

/// Writes the value into its parent, merging it with an object already placed there.
fn assign(parent: &mut Value, key: Key, value: Value) -> Result<(), PathError> {
    let merge = matches!(key.get(parent), Some(Value::Object(_))) && value.is_object();

    if merge {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (key.get_mut(parent), value)
        {
            existing.extend(incoming);
        }
        return Ok(());
    }

    key.set(parent, value)
}
