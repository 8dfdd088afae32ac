// SPDX-License-Identifier: AGPL-3.0-or-later

use log::debug;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::patch::{Patch, PatchError};
use crate::path::{
    ensure_path, get_by_segments, parse_patch_path, position_by_id, PathError, PathSegment,
};
use crate::schema::{Collection, FieldType};

/// A patch which could not be applied, with its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchFailure {
    pub index: usize,
    pub error: PatchError,
}

/// Outcome of applying a batch of patches.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult {
    /// Patched copy of the document, containing the effects of every successful patch.
    pub doc: Value,

    /// Failed patches, in batch order.
    pub errors: Vec<PatchFailure>,
}

impl PatchResult {
    /// Returns true if every patch of the batch was applied.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Applies patches in order to a copy of the document.
///
/// The collection is consulted to reject `block.add` patches with block types the addressed
/// blocks field does not declare.
pub fn apply_patches(collection: &Collection, document: &Value, patches: &[Patch]) -> PatchResult {
    let mut doc = document.clone();
    let errors = apply_all(collection, &[], &mut doc, patches);

    PatchResult { doc, errors }
}

/// Applies every patch to `doc`, which is addressed by `scope` inside the collection's schema.
fn apply_all(
    collection: &Collection,
    scope: &[PathSegment],
    doc: &mut Value,
    patches: &[Patch],
) -> Vec<PatchFailure> {
    let mut errors = Vec::new();

    for (index, patch) in patches.iter().enumerate() {
        // Failing patches must not leave partial edits behind
        let mut working = doc.clone();

        match apply_patch(collection, scope, &mut working, patch) {
            Ok(()) => *doc = working,
            Err(error) => {
                debug!("Patch {} on '{}' failed: {}", index, patch.path(), error);
                errors.push(PatchFailure { index, error });
            }
        }
    }

    errors
}

fn segments(path: &str) -> Result<Vec<PathSegment>, PatchError> {
    let segments = parse_patch_path(path);
    if segments.is_empty() {
        return Err(PathError::EmptyPath.into());
    }
    Ok(segments)
}

/// Returns the array at `path`, creating it when missing.
fn ensure_array<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>, PatchError> {
    let (parent, key) = ensure_path(doc, &segments(path)?)?;

    if matches!(key.get(parent), None | Some(Value::Null)) {
        key.set(parent, Value::Array(Vec::new()))?;
    }

    match key.get_mut(parent) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(PatchError::NotAnArray(path.to_string())),
    }
}

/// Returns the array at `path`, `None` when nothing is stored there.
fn find_array<'a>(
    doc: &'a mut Value,
    path: &str,
) -> Result<Option<&'a mut Vec<Value>>, PatchError> {
    let (parent, key) = match get_by_segments(doc, &segments(path)?) {
        Ok(found) => found,
        Err(err) if err.is_absent() => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    match key.get_mut(parent) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(PatchError::NotAnArray(path.to_string())),
    }
}

/// Returns the array at `path` together with the position of the item with the given id.
fn find_item<'a>(
    doc: &'a mut Value,
    path: &str,
    item_id: &str,
) -> Result<(&'a mut Vec<Value>, usize), PatchError> {
    let items =
        find_array(doc, path)?.ok_or_else(|| PatchError::ItemNotFound(item_id.to_string()))?;
    let position =
        position_by_id(items, item_id).ok_or_else(|| PatchError::ItemNotFound(item_id.to_string()))?;
    Ok((items, position))
}

/// Removes the item with the given id if there is one.
fn remove_item(doc: &mut Value, path: &str, item_id: &str) -> Result<(), PatchError> {
    if let Some(items) = find_array(doc, path)? {
        if let Some(position) = position_by_id(items, item_id) {
            items.remove(position);
        }
    }
    Ok(())
}

fn set_value(doc: &mut Value, segments: &[PathSegment], value: &Value) -> Result<(), PatchError> {
    let (parent, key) = ensure_path(doc, segments)?;
    key.set(parent, value.clone())?;
    Ok(())
}

/// Checks the block type against the blocks field the path resolves to, unknown paths are not
/// checked.
fn check_block_type(
    collection: &Collection,
    scope: &[PathSegment],
    path: &str,
    block_type: &str,
) -> Result<(), PatchError> {
    let relative = parse_patch_path(path);
    let absolute = [scope, relative.as_slice()].concat();

    if let Some(field) = collection.resolve(&absolute) {
        if let FieldType::Blocks { blocks } = &field.field_type {
            if !blocks.iter().any(|block| block.name == block_type) {
                return Err(PatchError::UnknownBlockType(block_type.to_string()));
            }
        }
    }

    Ok(())
}

fn apply_patch(
    collection: &Collection,
    scope: &[PathSegment],
    doc: &mut Value,
    patch: &Patch,
) -> Result<(), PatchError> {
    match patch {
        Patch::FieldSet { path, value } => set_value(doc, &segments(path)?, value),
        Patch::FieldClear { path } => match get_by_segments(doc, &segments(path)?) {
            Ok((parent, key)) => {
                key.remove(parent);
                Ok(())
            }
            Err(err) if err.is_absent() => Ok(()),
            Err(err) => Err(err.into()),
        },
        Patch::ArrayInsert { path, value, index } => {
            let items = ensure_array(doc, path)?;
            let at = index.map_or(items.len(), |index| index.min(items.len()));
            items.insert(at, value.clone());
            Ok(())
        }
        Patch::ArrayMove {
            path,
            item_id,
            to_index,
        } => {
            let items = find_array(doc, path)?
                .ok_or_else(|| PatchError::ItemNotFound(item_id.to_string()))?;

            let from = position_by_id(items, item_id)
                .or_else(|| item_id.parse::<usize>().ok())
                .ok_or_else(|| PatchError::ItemNotFound(item_id.to_string()))?;
            if from >= items.len() {
                return Err(PathError::IndexOutOfRange {
                    index: from,
                    len: items.len(),
                }
                .into());
            }

            let item = items.remove(from);
            let to = to_index.map_or(items.len(), |index| index.min(items.len()));
            items.insert(to, item);
            Ok(())
        }
        Patch::ArrayRemove { path, item_id } | Patch::BlockRemove { path, item_id } => {
            remove_item(doc, path, item_id)
        }
        Patch::ArrayUpdateItem {
            path,
            item_id,
            patches,
        } => {
            let (items, position) = find_item(doc, path, item_id)?;

            let relative = parse_patch_path(path);
            let mut nested_scope = [scope, relative.as_slice()].concat();
            nested_scope.push(PathSegment::Id(item_id.to_owned()));

            let mut item = items[position].clone();
            let errors = apply_all(collection, &nested_scope, &mut item, patches);
            if !errors.is_empty() {
                return Err(PatchError::Nested(errors));
            }

            items[position] = item;
            Ok(())
        }
        Patch::BlockAdd {
            path,
            block_type,
            value,
            index,
            id,
        } => {
            check_block_type(collection, scope, path, block_type)?;

            // An id inside the initial value wins, the type always is the checked block type
            let id = id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut block = Map::new();
            block.insert("id".into(), Value::String(id));
            match value {
                None | Some(Value::Null) => (),
                Some(Value::Object(initial)) => block.extend(initial.clone()),
                Some(_) => return Err(PatchError::NotAnObject(path.to_string())),
            }
            block.insert("type".into(), Value::String(block_type.to_owned()));

            let items = ensure_array(doc, path)?;
            let at = index.map_or(items.len(), |index| index.min(items.len()));
            items.insert(at, Value::Object(block));
            Ok(())
        }
        Patch::BlockMove {
            path,
            item_id,
            to_index,
        } => {
            let (items, position) = find_item(doc, path, item_id)?;
            let block = items.remove(position);
            let to = (*to_index).min(items.len());
            items.insert(to, block);
            Ok(())
        }
        Patch::BlockUpdateField {
            path,
            item_id,
            field,
            value,
        } => {
            let (items, position) = find_item(doc, path, item_id)?;
            let block = &mut items[position];

            // Blocks in their stored shape keep their values below "fields"
            let stored_shape = block.get("type") == Some(&Value::String("block".into()))
                && matches!(block.get("fields"), Some(Value::Object(_)));
            let mut target = Vec::new();
            if stored_shape {
                target.push(PathSegment::Field("fields".into()));
            }
            target.extend(segments(field)?);

            set_value(block, &target, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::{json, Value};

    use crate::patch::{Patch, PatchError};
    use crate::path::PathError;
    use crate::test_utils::article_collection;

    use super::apply_patches;

    #[fixture]
    fn document() -> Value {
        json!({
            "title": "Hello",
            "images": [
                { "id": "a", "caption": "First" },
                { "id": "b", "caption": "Second" },
                { "id": "c", "caption": "Third" }
            ],
            "content": [
                { "id": "h1", "type": "hero", "heading": "Welcome" },
                {
                    "id": "g1",
                    "type": "block",
                    "name": "gallery",
                    "fields": { "images": [] }
                }
            ]
        })
    }

    fn patch(value: Value) -> Patch {
        serde_json::from_value(value).unwrap()
    }

    fn captions(doc: &Value) -> Vec<&str> {
        doc["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["caption"].as_str().unwrap())
            .collect()
    }

    #[rstest]
    fn partial_success(document: Value) {
        let patches = vec![
            patch(json!({ "op": "field.set", "path": "title", "value": "Hi" })),
            patch(json!({
                "op": "array.updateItem",
                "path": "images",
                "itemId": "missing",
                "patches": [{ "op": "field.set", "path": "caption", "value": "x" }]
            })),
            patch(json!({ "op": "field.set", "path": "seo.description", "value": "New" })),
        ];

        let result = apply_patches(&article_collection(), &document, &patches);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, 1);
        assert_eq!(
            result.errors[0].error,
            PatchError::ItemNotFound("missing".into())
        );
        assert_eq!(result.doc["title"], json!("Hi"));
        assert_eq!(result.doc["seo"]["description"], json!("New"));

        // Input document stays untouched
        assert_eq!(document["title"], json!("Hello"));
    }

    #[rstest]
    #[case::by_id("c", Some(0), vec!["Third", "First", "Second"])]
    #[case::append_by_default("a", None, vec!["Second", "Third", "First"])]
    #[case::clamped("a", Some(10), vec!["Second", "Third", "First"])]
    fn moves_array_items(
        document: Value,
        #[case] item_id: &str,
        #[case] to_index: Option<usize>,
        #[case] expected: Vec<&str>,
    ) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[Patch::ArrayMove {
                path: "images".into(),
                item_id: item_id.into(),
                to_index,
            }],
        );

        assert!(result.is_ok());
        assert_eq!(captions(&result.doc), expected);
    }

    #[test]
    fn array_move_falls_back_to_index() {
        let document = json!({ "tags": ["x", "y", "z"] });
        let collection = article_collection();

        let result = apply_patches(
            &collection,
            &document,
            &[patch(json!({ "op": "array.move", "path": "tags", "itemId": "2", "toIndex": 0 }))],
        );
        assert!(result.is_ok());
        assert_eq!(result.doc, json!({ "tags": ["z", "x", "y"] }));

        let result = apply_patches(
            &collection,
            &document,
            &[patch(json!({ "op": "array.move", "path": "tags", "itemId": "7" }))],
        );
        assert_eq!(
            result.errors[0].error,
            PatchError::Path(PathError::IndexOutOfRange { index: 7, len: 3 })
        );
        assert_eq!(result.doc, document);
    }

    #[rstest]
    fn field_operations(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[
                patch(json!({ "op": "field.set", "path": "images[id=b].caption", "value": "2nd" })),
                patch(json!({ "op": "field.set", "path": "meta.tags[1]", "value": "new" })),
                patch(json!({ "op": "field.clear", "path": "images[0]" })),
                patch(json!({ "op": "field.clear", "path": "nothing.here" })),
                patch(json!({ "op": "field.clear", "path": "images[id=gone]" })),
            ],
        );

        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(captions(&result.doc), vec!["2nd", "Third"]);
        assert_eq!(result.doc["meta"], json!({ "tags": [null, "new"] }));
    }

    #[rstest]
    fn field_set_refuses_wrong_container(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[patch(json!({ "op": "field.set", "path": "title[0]", "value": "x" }))],
        );

        assert_eq!(
            result.errors[0].error,
            PatchError::Path(PathError::ExpectedArray("[0]".into()))
        );
        assert_eq!(result.doc, document);
    }

    #[rstest]
    fn array_insert_and_remove(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[
                patch(json!({
                    "op": "array.insert",
                    "path": "images",
                    "value": { "id": "z", "caption": "Zero" },
                    "index": 0
                })),
                patch(json!({ "op": "array.insert", "path": "tags", "value": "first" })),
                patch(json!({ "op": "array.remove", "path": "images", "itemId": "b" })),
                patch(json!({ "op": "array.remove", "path": "images", "itemId": "missing" })),
                patch(json!({ "op": "array.insert", "path": "title", "value": "x" })),
            ],
        );

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, 4);
        assert_eq!(
            result.errors[0].error,
            PatchError::NotAnArray("title".into())
        );
        assert_eq!(captions(&result.doc), vec!["Zero", "First", "Third"]);
        assert_eq!(result.doc["tags"], json!(["first"]));
    }

    #[rstest]
    fn nested_update_is_all_or_nothing(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[patch(json!({
                "op": "array.updateItem",
                "path": "images",
                "itemId": "a",
                "patches": [
                    { "op": "field.set", "path": "caption", "value": "Changed" },
                    { "op": "field.set", "path": "caption[0]", "value": "x" }
                ]
            }))],
        );

        match &result.errors[0].error {
            PatchError::Nested(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, 1);
            }
            err => panic!("Unexpected error {:?}", err),
        }
        assert_eq!(captions(&result.doc)[0], "First");

        let result = apply_patches(
            &article_collection(),
            &document,
            &[patch(json!({
                "op": "array.updateItem",
                "path": "images",
                "itemId": "a",
                "patches": [{ "op": "field.set", "path": "caption", "value": "Changed" }]
            }))],
        );
        assert!(result.is_ok());
        assert_eq!(captions(&result.doc)[0], "Changed");
    }

    #[rstest]
    fn block_operations(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[
                patch(json!({
                    "op": "block.add",
                    "path": "content",
                    "blockType": "hero",
                    "value": { "heading": "Added" },
                    "index": 0,
                    "id": "h2"
                })),
                patch(json!({ "op": "block.move", "path": "content", "itemId": "g1", "toIndex": 0 })),
                patch(json!({
                    "op": "block.updateField",
                    "path": "content",
                    "itemId": "h1",
                    "field": "heading",
                    "value": "Updated"
                })),
                patch(json!({
                    "op": "block.updateField",
                    "path": "content",
                    "itemId": "g1",
                    "field": "images[0].caption",
                    "value": "Sunset"
                })),
                patch(json!({ "op": "block.remove", "path": "content", "itemId": "nope" })),
            ],
        );

        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(
            result.doc["content"],
            json!([
                {
                    "id": "g1",
                    "type": "block",
                    "name": "gallery",
                    "fields": { "images": [{ "caption": "Sunset" }] }
                },
                { "id": "h2", "type": "hero", "heading": "Added" },
                { "id": "h1", "type": "hero", "heading": "Updated" }
            ])
        );
    }

    #[rstest]
    fn block_errors(document: Value) {
        let result = apply_patches(
            &article_collection(),
            &document,
            &[
                patch(json!({ "op": "block.add", "path": "content", "blockType": "footer" })),
                patch(json!({ "op": "block.move", "path": "content", "itemId": "nope", "toIndex": 0 })),
                patch(json!({
                    "op": "block.updateField",
                    "path": "content",
                    "itemId": "nope",
                    "field": "heading",
                    "value": "x"
                })),
            ],
        );

        assert_eq!(
            result
                .errors
                .iter()
                .map(|failure| failure.error.clone())
                .collect::<Vec<PatchError>>(),
            vec![
                PatchError::UnknownBlockType("footer".into()),
                PatchError::ItemNotFound("nope".into()),
                PatchError::ItemNotFound("nope".into()),
            ]
        );
        assert_eq!(result.doc, document);
    }

    #[test]
    fn block_add_keeps_id_of_initial_value() {
        let result = apply_patches(
            &article_collection(),
            &json!({}),
            &[
                patch(json!({
                    "op": "block.add",
                    "path": "content",
                    "blockType": "hero",
                    "id": "from-patch",
                    "value": { "id": "from-value", "type": "gallery", "heading": "Hi" }
                })),
                patch(json!({
                    "op": "block.add",
                    "path": "content",
                    "blockType": "hero",
                    "id": "from-patch"
                })),
            ],
        );

        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(
            result.doc["content"],
            json!([
                { "id": "from-value", "type": "hero", "heading": "Hi" },
                { "id": "from-patch", "type": "hero" }
            ])
        );
    }

    #[test]
    fn huge_indices_fail_the_single_patch() {
        let result = apply_patches(
            &article_collection(),
            &json!({ "title": "Hello", "tags": ["a"] }),
            &[
                patch(json!({
                    "op": "field.set",
                    "path": "tags[18446744073709551615]",
                    "value": "x"
                })),
                patch(json!({ "op": "field.set", "path": "tags[1000000000000]", "value": "x" })),
                patch(json!({ "op": "field.set", "path": "title", "value": "Hi" })),
            ],
        );

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].index, 0);
        assert_eq!(
            result.errors[0].error,
            PatchError::Path(PathError::IndexOutOfRange {
                index: usize::MAX,
                len: 1
            })
        );
        assert_eq!(result.errors[1].index, 1);
        assert_eq!(result.doc, json!({ "title": "Hi", "tags": ["a"] }));
    }

    #[test]
    fn block_add_mints_ids() {
        let result = apply_patches(
            &article_collection(),
            &json!({}),
            &[
                patch(json!({ "op": "block.add", "path": "content", "blockType": "hero" })),
                patch(json!({ "op": "block.add", "path": "content", "blockType": "hero" })),
            ],
        );

        assert!(result.is_ok());
        let blocks = result.doc["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], json!("hero"));
        assert!(blocks[0]["id"].is_string());
        assert_ne!(blocks[0]["id"], blocks[1]["id"]);
    }
}
