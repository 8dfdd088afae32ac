// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single structural edit, addressed with a patch path like `reviews[0].rating` or
/// `content[id=xyz]`.
///
/// Serialized with an `op` tag, for example
/// `{ "op": "array.move", "path": "images", "itemId": "abc", "toIndex": 0 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Patch {
    /// Assigns a value, creating missing containers along the path.
    #[serde(rename = "field.set")]
    FieldSet { path: String, value: Value },

    /// Deletes a key or splices an array index out. Does nothing when the path is absent.
    #[serde(rename = "field.clear")]
    FieldClear { path: String },

    /// Inserts an item at the given index, appends when no index is given.
    #[serde(rename = "array.insert")]
    ArrayInsert {
        path: String,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Moves the item with the given id. Arrays of items without ids can be addressed by
    /// passing the position as id.
    #[serde(rename = "array.move", rename_all = "camelCase")]
    ArrayMove {
        path: String,
        item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_index: Option<usize>,
    },

    /// Removes the item with the given id, does nothing when there is none.
    #[serde(rename = "array.remove", rename_all = "camelCase")]
    ArrayRemove { path: String, item_id: String },

    /// Applies nested patches to one item, paths are relative to the item.
    #[serde(rename = "array.updateItem", rename_all = "camelCase")]
    ArrayUpdateItem {
        path: String,
        item_id: String,
        patches: Vec<Patch>,
    },

    /// Adds a `{ id, ..value, type }` block. An id inside `value` takes precedence over `id`,
    /// an id is minted when neither is given.
    #[serde(rename = "block.add", rename_all = "camelCase")]
    BlockAdd {
        path: String,
        block_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    #[serde(rename = "block.move", rename_all = "camelCase")]
    BlockMove {
        path: String,
        item_id: String,
        to_index: usize,
    },

    #[serde(rename = "block.remove", rename_all = "camelCase")]
    BlockRemove { path: String, item_id: String },

    /// Sets a field of the block with the given id.
    #[serde(rename = "block.updateField", rename_all = "camelCase")]
    BlockUpdateField {
        path: String,
        item_id: String,
        field: String,
        value: Value,
    },
}

impl Patch {
    /// Path of the value or array this patch operates on.
    pub fn path(&self) -> &str {
        match self {
            Patch::FieldSet { path, .. }
            | Patch::FieldClear { path }
            | Patch::ArrayInsert { path, .. }
            | Patch::ArrayMove { path, .. }
            | Patch::ArrayRemove { path, .. }
            | Patch::ArrayUpdateItem { path, .. }
            | Patch::BlockAdd { path, .. }
            | Patch::BlockMove { path, .. }
            | Patch::BlockRemove { path, .. }
            | Patch::BlockUpdateField { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Patch;

    #[test]
    fn deserializes_tagged_patches() {
        let patches: Vec<Patch> = serde_json::from_value(json!([
            { "op": "field.set", "path": "title", "value": "Hello" },
            { "op": "array.move", "path": "images", "itemId": "a", "toIndex": 2 },
            {
                "op": "array.updateItem",
                "path": "images",
                "itemId": "a",
                "patches": [{ "op": "field.clear", "path": "caption" }]
            },
            { "op": "block.add", "path": "content", "blockType": "hero" }
        ]))
        .unwrap();

        assert_eq!(
            patches[1],
            Patch::ArrayMove {
                path: "images".into(),
                item_id: "a".into(),
                to_index: Some(2)
            }
        );
        assert_eq!(
            patches[3],
            Patch::BlockAdd {
                path: "content".into(),
                block_type: "hero".into(),
                value: None,
                index: None,
                id: None
            }
        );
        assert_eq!(patches[2].path(), "images");
    }

    #[test]
    fn rejects_unknown_operations() {
        assert!(serde_json::from_value::<Patch>(json!({ "op": "field.rename", "path": "a" })).is_err());
    }
}
