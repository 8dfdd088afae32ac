// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::document::FlattenError;
use crate::path::join_store_path;
use crate::schema::{BlockDefinition, Collection, FieldDefinition, FieldType};

/// Identity and metadata of one element of a blocks field.
///
/// Block rows only carry the block fields' scalar values, the element's stable id, its block
/// type and free-form meta are kept next to them, keyed by the element's store path
/// (`content.0`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockMeta {
    pub path: String,
    pub item_id: String,
    pub block_type: String,
    pub meta: Option<Value>,
}

/// A blocks field element, parsed from one of the two accepted shapes:
///
/// - `{ "id", "type": "block", "name": <block type>, "fields": { .. }, "meta" }`
/// - `{ "id", "type": <block type>, ..fields }`, as produced by `block.add` patches
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockElement {
    pub id: Option<String>,
    pub name: String,
    pub fields: Map<String, Value>,
    pub meta: Option<Value>,
}

impl BlockElement {
    pub fn parse(item: &Value, path: &str) -> Result<Self, FlattenError> {
        let invalid = || FlattenError::InvalidValue {
            path: path.to_string(),
            expected: "block object",
        };

        let object = item.as_object().ok_or_else(invalid)?;

        let id = match object.get("id") {
            Some(Value::String(id)) => Some(id.to_owned()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        let meta = object.get("meta").filter(|meta| !meta.is_null()).cloned();
        let block_type = object.get("type").and_then(Value::as_str);
        let name = object.get("name").and_then(Value::as_str);

        match (block_type, name) {
            (None | Some("block"), Some(name)) => {
                let fields = match object.get("fields") {
                    Some(Value::Object(fields)) => fields.to_owned(),
                    None | Some(Value::Null) => Map::new(),
                    Some(_) => {
                        return Err(FlattenError::InvalidValue {
                            path: join_store_path(path, "fields"),
                            expected: "object",
                        })
                    }
                };

                Ok(Self {
                    id,
                    name: name.to_owned(),
                    fields,
                    meta,
                })
            }
            (Some(block_type), _) if block_type != "block" => {
                let fields = object
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "id" | "type" | "meta"))
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
                    .collect();

                Ok(Self {
                    id,
                    name: block_type.to_owned(),
                    fields,
                    meta,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Looks up the definition of a block type, failing with the element's path when unknown.
pub(crate) fn find_block<'a>(
    blocks: &'a [BlockDefinition],
    name: &str,
    path: &str,
) -> Result<&'a BlockDefinition, FlattenError> {
    blocks
        .iter()
        .find(|block| block.name == name)
        .ok_or_else(|| FlattenError::UnknownBlockType {
            path: path.to_string(),
            name: name.to_string(),
        })
}

/// Collects identity and meta of every block element in the document, nested blocks included.
///
/// Elements without an `id` reuse the item id the previous version stored for the same path,
/// only elements which are new at their position get a freshly minted one.
pub fn collect_block_meta(
    document: &Value,
    collection: &Collection,
    previous: &HashMap<String, String>,
) -> Result<Vec<BlockMeta>, FlattenError> {
    let object = document.as_object().ok_or(FlattenError::InvalidValue {
        path: String::new(),
        expected: "object",
    })?;

    let mut block_meta = Vec::new();
    collect_in(object, collection.fields(), "", previous, &mut block_meta)?;
    Ok(block_meta)
}

fn collect_in(
    object: &Map<String, Value>,
    fields: &[FieldDefinition],
    prefix: &str,
    previous: &HashMap<String, String>,
    block_meta: &mut Vec<BlockMeta>,
) -> Result<(), FlattenError> {
    for field in fields {
        let value = match object.get(&field.name) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        let path = join_store_path(prefix, &field.name);

        match (&field.field_type, value) {
            (FieldType::Group { fields }, Value::Object(inner)) => {
                collect_in(inner, fields, &path, previous, block_meta)?
            }
            (FieldType::Array { fields }, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(inner) = item {
                        let item_path = join_store_path(&path, &index.to_string());
                        collect_in(inner, fields, &item_path, previous, block_meta)?;
                    }
                }
            }
            (FieldType::Blocks { blocks }, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }

                    let item_path = join_store_path(&path, &index.to_string());
                    let element = BlockElement::parse(item, &item_path)?;
                    let block = find_block(blocks, &element.name, &item_path)?;

                    let item_id = element
                        .id
                        .or_else(|| previous.get(&item_path).cloned())
                        .unwrap_or_else(|| Uuid::new_v4().to_string());

                    let block_path = join_store_path(&item_path, &block.name);
                    block_meta.push(BlockMeta {
                        path: item_path,
                        item_id,
                        block_type: element.name,
                        meta: element.meta,
                    });

                    collect_in(&element.fields, &block.fields, &block_path, previous, block_meta)?;
                }
            }
            _ => (),
        }
    }

    Ok(())
}

/// Turns the reconstructed `{ <block type>: { ..fields } }` elements of all blocks fields into
/// full block elements carrying their id, type and meta.
///
/// Elements which only exist as block meta, because none of their fields hold a value, are
/// restored with empty fields.
pub fn attach_block_meta(document: &mut Value, collection: &Collection, block_meta: &[BlockMeta]) {
    let by_path: HashMap<&str, &BlockMeta> = block_meta
        .iter()
        .map(|meta| (meta.path.as_str(), meta))
        .collect();

    if let Value::Object(object) = document {
        attach_in(object, collection.fields(), "", &by_path);
    }
}

/// Number of elements the block meta knows about directly below the given blocks field path.
fn known_elements(path: &str, by_path: &HashMap<&str, &BlockMeta>) -> usize {
    let prefix = format!("{}.", path);
    by_path
        .keys()
        .filter_map(|meta_path| meta_path.strip_prefix(&prefix)?.parse::<usize>().ok())
        .map(|index| index + 1)
        .max()
        .unwrap_or(0)
}

fn attach_in(
    object: &mut Map<String, Value>,
    fields: &[FieldDefinition],
    prefix: &str,
    by_path: &HashMap<&str, &BlockMeta>,
) {
    for field in fields {
        let path = join_store_path(prefix, &field.name);

        match &field.field_type {
            FieldType::Group { fields } => {
                if let Some(Value::Object(inner)) = object.get_mut(&field.name) {
                    attach_in(inner, fields, &path, by_path);
                }
            }
            FieldType::Array { fields } => {
                if let Some(Value::Array(items)) = object.get_mut(&field.name) {
                    for (index, item) in items.iter_mut().enumerate() {
                        if let Value::Object(inner) = item {
                            let item_path = join_store_path(&path, &index.to_string());
                            attach_in(inner, fields, &item_path, by_path);
                        }
                    }
                }
            }
            FieldType::Blocks { blocks } => {
                let known = known_elements(&path, by_path);
                if known == 0 && !object.contains_key(&field.name) {
                    continue;
                }

                let entry = object
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if entry.is_null() {
                    *entry = Value::Array(Vec::new());
                }

                if let Value::Array(items) = entry {
                    if items.len() < known {
                        items.resize(known, Value::Null);
                    }

                    for (index, item) in items.iter_mut().enumerate() {
                        let item_path = join_store_path(&path, &index.to_string());
                        let meta = by_path.get(item_path.as_str()).copied();
                        *item = wrap_block(item.take(), blocks, &item_path, meta, by_path);
                    }
                }
            }
            _ => (),
        }
    }
}

fn wrap_block(
    item: Value,
    blocks: &[BlockDefinition],
    item_path: &str,
    meta: Option<&BlockMeta>,
    by_path: &HashMap<&str, &BlockMeta>,
) -> Value {
    let (name, mut fields) = match item {
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((name, Value::Object(fields))) => (name, fields),
            Some((name, Value::Null)) => (name, Map::new()),
            Some((name, other)) => {
                let mut map = Map::new();
                map.insert(name, other);
                return Value::Object(map);
            }
            None => return Value::Null,
        },
        Value::Null => match meta {
            Some(meta) => (meta.block_type.clone(), Map::new()),
            None => return Value::Null,
        },
        other => return other,
    };

    if let Some(block) = blocks.iter().find(|block| block.name == name) {
        let block_path = join_store_path(item_path, &name);
        attach_in(&mut fields, &block.fields, &block_path, by_path);
    }

    let mut element = Map::new();
    if let Some(meta) = meta {
        element.insert("id".into(), Value::String(meta.item_id.clone()));
    }
    element.insert("type".into(), Value::String("block".into()));
    element.insert("name".into(), Value::String(name));
    element.insert("fields".into(), Value::Object(fields));
    if let Some(value) = meta.and_then(|meta| meta.meta.clone()) {
        element.insert("meta".into(), value);
    }

    Value::Object(element)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;
    use serde_json::{json, Value};

    use crate::document::FlattenError;
    use crate::test_utils::article_collection;

    use super::{attach_block_meta, collect_block_meta, BlockElement, BlockMeta};

    #[rstest]
    #[case::canonical(json!({
        "id": "b1",
        "type": "block",
        "name": "hero",
        "fields": { "heading": "Hi" },
        "meta": { "collapsed": true }
    }))]
    #[case::patch_shape(json!({
        "id": "b1",
        "type": "hero",
        "heading": "Hi",
        "meta": { "collapsed": true }
    }))]
    fn parses_both_block_shapes(#[case] item: Value) {
        let element = BlockElement::parse(&item, "content.0").unwrap();
        assert_eq!(element.id.as_deref(), Some("b1"));
        assert_eq!(element.name, "hero");
        assert_eq!(element.fields.get("heading"), Some(&json!("Hi")));
        assert_eq!(element.meta, Some(json!({ "collapsed": true })));
    }

    #[test]
    fn rejects_nameless_blocks() {
        assert!(BlockElement::parse(&json!({ "type": "block" }), "content.0").is_err());
        assert!(BlockElement::parse(&json!("hero"), "content.0").is_err());
    }

    #[test]
    fn reuses_previous_item_ids() {
        let collection = article_collection();
        let document = json!({
            "content": [
                { "type": "block", "name": "hero", "fields": { "heading": "One" } },
                { "id": "given", "type": "block", "name": "hero", "fields": {} },
                { "type": "block", "name": "gallery", "fields": {} }
            ]
        });

        let mut previous = HashMap::new();
        previous.insert("content.0".to_string(), "stable".to_string());

        let block_meta = collect_block_meta(&document, &collection, &previous).unwrap();
        assert_eq!(block_meta.len(), 3);
        assert_eq!(block_meta[0].item_id, "stable");
        assert_eq!(block_meta[1].item_id, "given");
        assert_eq!(block_meta[2].block_type, "gallery");

        // New elements get a fresh id which is kept when the same document is collected again
        let mut previous: HashMap<String, String> = block_meta
            .iter()
            .map(|meta| (meta.path.clone(), meta.item_id.clone()))
            .collect();
        previous.insert("unrelated".into(), "x".into());
        let again = collect_block_meta(&document, &collection, &previous).unwrap();
        assert_eq!(again, block_meta);
    }

    #[test]
    fn unknown_block_type() {
        let collection = article_collection();
        let document = json!({
            "content": [{ "type": "block", "name": "footer", "fields": {} }]
        });

        assert_eq!(
            collect_block_meta(&document, &collection, &HashMap::new()).unwrap_err(),
            FlattenError::UnknownBlockType {
                path: "content.0".into(),
                name: "footer".into()
            }
        );
    }

    #[test]
    fn attaches_identity_and_restores_empty_blocks() {
        let collection = article_collection();
        let mut document = json!({
            "content": [
                { "hero": { "heading": "One" } }
            ]
        });

        let block_meta = vec![
            BlockMeta {
                path: "content.0".into(),
                item_id: "a".into(),
                block_type: "hero".into(),
                meta: None,
            },
            BlockMeta {
                path: "content.1".into(),
                item_id: "b".into(),
                block_type: "gallery".into(),
                meta: Some(json!({ "layout": "grid" })),
            },
        ];

        attach_block_meta(&mut document, &collection, &block_meta);

        assert_eq!(
            document,
            json!({
                "content": [
                    { "id": "a", "type": "block", "name": "hero", "fields": { "heading": "One" } },
                    {
                        "id": "b",
                        "type": "block",
                        "name": "gallery",
                        "fields": {},
                        "meta": { "layout": "grid" }
                    }
                ]
            })
        );
    }
}
