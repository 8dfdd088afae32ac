// SPDX-License-Identifier: AGPL-3.0-or-later

use serde_json::{Map, Value};

use crate::path::{PathError, PathSegment};

/// Upper bound of null elements an array is padded with to reach an addressed index.
const MAX_ARRAY_PADDING: usize = 1024;

/// Pads the array with nulls so `index` lies inside of it.
fn pad_to(items: &mut Vec<Value>, index: usize) -> Result<(), PathError> {
    if index < items.len() {
        return Ok(());
    }

    if index - items.len() >= MAX_ARRAY_PADDING {
        return Err(PathError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }

    items.resize(index + 1, Value::Null);
    Ok(())
}

/// Position of a value inside its parent container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl Key {
    /// Returns the value stored at this key inside `parent`.
    pub fn get<'a>(&self, parent: &'a Value) -> Option<&'a Value> {
        match (self, parent) {
            (Key::Field(name), Value::Object(map)) => map.get(name),
            (Key::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value stored at this key inside `parent`.
    pub fn get_mut<'a>(&self, parent: &'a mut Value) -> Option<&'a mut Value> {
        match (self, parent) {
            (Key::Field(name), Value::Object(map)) => map.get_mut(name),
            (Key::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        }
    }

    /// Writes `value` at this key, overwriting what was there before. Arrays are padded with
    /// nulls when the index lies behind their end, up to a bounded number of elements.
    pub fn set(&self, parent: &mut Value, value: Value) -> Result<(), PathError> {
        match (self, parent) {
            (Key::Field(name), Value::Object(map)) => {
                map.insert(name.to_owned(), value);
                Ok(())
            }
            (Key::Index(index), Value::Array(items)) => {
                pad_to(items, *index)?;
                items[*index] = value;
                Ok(())
            }
            (Key::Field(name), _) => Err(PathError::ExpectedObject(name.to_owned())),
            (Key::Index(index), _) => Err(PathError::ExpectedArray(format!("[{}]", index))),
        }
    }

    /// Deletes the key from an object or splices the index out of an array. Returns the removed
    /// value, or `None` when nothing was stored there.
    pub fn remove(&self, parent: &mut Value) -> Option<Value> {
        match (self, parent) {
            (Key::Field(name), Value::Object(map)) => map.remove(name),
            (Key::Index(index), Value::Array(items)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }
}

/// Finds the position of the array element whose `id` equals the given one.
pub(crate) fn position_by_id(items: &[Value], id: &str) -> Option<usize> {
    items.iter().position(|item| match item.get("id") {
        Some(Value::String(item_id)) => item_id == id,
        Some(Value::Number(item_id)) => item_id.to_string() == id,
        _ => false,
    })
}

/// Determines the key a segment addresses inside an existing container, without modifying it.
fn resolve_key(container: &Value, segment: &PathSegment) -> Result<Key, PathError> {
    match (segment, container) {
        (PathSegment::Field(name), Value::Object(_)) => Ok(Key::Field(name.to_owned())),
        (PathSegment::Field(name), Value::Array(_)) => match name.parse::<usize>() {
            Ok(index) => Ok(Key::Index(index)),
            Err(_) => Err(PathError::ExpectedObject(segment.to_string())),
        },
        (PathSegment::Index(index), Value::Array(_)) => Ok(Key::Index(*index)),
        (PathSegment::Id(id), Value::Array(items)) => position_by_id(items, id)
            .map(Key::Index)
            .ok_or_else(|| PathError::IdNotFound(id.to_owned())),
        (_, Value::Null) => Err(PathError::NotFound(segment.to_string())),
        (PathSegment::Field(_), _) => Err(PathError::ExpectedObject(segment.to_string())),
        (PathSegment::Index(_), _) | (PathSegment::Id(_), _) => {
            Err(PathError::ExpectedArray(segment.to_string()))
        }
    }
}

/// Walks an existing document along the given segments and returns the parent container of the
/// addressed value together with its key.
///
/// Fails when an index or id segment is applied to a non-array, when an id lookup finds no
/// element or when an intermediate value is missing. The last key itself is not required to
/// exist, callers check that when reading.
pub fn get_by_segments<'a>(
    root: &'a mut Value,
    segments: &[PathSegment],
) -> Result<(&'a mut Value, Key), PathError> {
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;

    let mut current = root;
    for segment in parents {
        let key = resolve_key(current, segment)?;
        current = key
            .get_mut(current)
            .ok_or_else(|| PathError::NotFound(segment.to_string()))?;
    }

    let key = resolve_key(current, last)?;
    Ok((current, key))
}

/// Read-only lookup of the value at the given segments.
pub fn get_value<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        let key = resolve_key(current, segment).ok()?;
        current = key.get(current)?;
    }
    Some(current)
}

/// Returns an empty container suitable for the segment which is going to be applied to it.
fn container_for(segment: &PathSegment) -> Value {
    match segment {
        PathSegment::Field(_) => Value::Object(Map::new()),
        PathSegment::Index(_) | PathSegment::Id(_) => Value::Array(Vec::new()),
    }
}

/// Like [`resolve_key`] but creates what is missing: null containers are replaced with the
/// fitting container type, arrays are padded up to the addressed index and id lookups without a
/// match append a new `{ "id": <value> }` element.
fn ensure_key(container: &mut Value, segment: &PathSegment) -> Result<Key, PathError> {
    if container.is_null() {
        *container = container_for(segment);
    }

    match (segment, container) {
        (PathSegment::Field(name), Value::Object(_)) => Ok(Key::Field(name.to_owned())),
        (PathSegment::Field(name), Value::Array(items)) => match name.parse::<usize>() {
            Ok(index) => {
                pad_to(items, index)?;
                Ok(Key::Index(index))
            }
            Err(_) => Err(PathError::ExpectedObject(segment.to_string())),
        },
        (PathSegment::Index(index), Value::Array(items)) => {
            pad_to(items, *index)?;
            Ok(Key::Index(*index))
        }
        (PathSegment::Id(id), Value::Array(items)) => match position_by_id(items, id) {
            Some(index) => Ok(Key::Index(index)),
            None => {
                let mut placeholder = Map::new();
                placeholder.insert("id".into(), Value::String(id.to_owned()));
                items.push(Value::Object(placeholder));
                Ok(Key::Index(items.len() - 1))
            }
        },
        (PathSegment::Field(_), _) => Err(PathError::ExpectedObject(segment.to_string())),
        (PathSegment::Index(_), _) | (PathSegment::Id(_), _) => {
            Err(PathError::ExpectedArray(segment.to_string()))
        }
    }
}

/// Walks the document along the given segments, creating missing intermediate containers on the
/// way down: arrays when the following segment is index or id shaped, objects otherwise.
///
/// Returns the parent container of the addressed value together with its key.
pub fn ensure_path<'a>(
    root: &'a mut Value,
    segments: &[PathSegment],
) -> Result<(&'a mut Value, Key), PathError> {
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;

    let mut current = root;
    for (position, segment) in parents.iter().enumerate() {
        let next = &segments[position + 1];
        let key = ensure_key(current, segment)?;

        if key.get(current).is_none() {
            key.set(current, container_for(next))?;
        }

        let child = key
            .get_mut(current)
            .ok_or_else(|| PathError::NotFound(segment.to_string()))?;
        if child.is_null() {
            *child = container_for(next);
        }
        current = child;
    }

    let key = ensure_key(current, last)?;
    Ok((current, key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::path::{parse_patch_path, PathError};

    use super::{ensure_path, get_by_segments, get_value, Key};

    #[test]
    fn locates_existing_values() {
        let mut doc = json!({
            "reviews": [
                { "id": "a", "rating": 3 },
                { "id": "b", "rating": 5 }
            ]
        });

        let (parent, key) = get_by_segments(&mut doc, &parse_patch_path("reviews[1].rating")).unwrap();
        assert_eq!(key, Key::Field("rating".into()));
        assert_eq!(key.get(parent), Some(&json!(5)));

        let (parent, key) = get_by_segments(&mut doc, &parse_patch_path("reviews[id=a]")).unwrap();
        assert_eq!(key, Key::Index(0));
        assert_eq!(key.get(parent).unwrap()["rating"], json!(3));

        // Numeric field names are treated as positions inside arrays
        assert_eq!(
            get_value(&doc, &parse_patch_path("reviews.1.id")),
            Some(&json!("b"))
        );
    }

    #[test]
    fn read_errors() {
        let mut doc = json!({ "title": "Hello", "items": [{ "id": "x" }] });

        assert_eq!(
            get_by_segments(&mut doc, &parse_patch_path("title[0]")).unwrap_err(),
            PathError::ExpectedArray("[0]".into())
        );
        assert_eq!(
            get_by_segments(&mut doc, &parse_patch_path("items[id=nope]")).unwrap_err(),
            PathError::IdNotFound("nope".into())
        );
        assert!(get_by_segments(&mut doc, &parse_patch_path("missing.deeper"))
            .unwrap_err()
            .is_absent());
        assert_eq!(
            get_by_segments(&mut doc, &[]).unwrap_err(),
            PathError::EmptyPath
        );
    }

    #[test]
    fn ensures_missing_containers() {
        let mut doc = json!({});

        let (parent, key) = ensure_path(&mut doc, &parse_patch_path("a.b[2].c")).unwrap();
        key.set(parent, json!("value")).unwrap();

        assert_eq!(
            doc,
            json!({ "a": { "b": [null, null, { "c": "value" }] } })
        );
    }

    #[test]
    fn ensures_id_placeholders() {
        let mut doc = json!({ "content": [{ "id": "first", "title": "One" }] });

        let (parent, key) = ensure_path(&mut doc, &parse_patch_path("content[id=second].title")).unwrap();
        key.set(parent, json!("Two")).unwrap();

        let (parent, key) = ensure_path(&mut doc, &parse_patch_path("content[id=first].title")).unwrap();
        key.set(parent, json!("Uno")).unwrap();

        assert_eq!(
            doc,
            json!({
                "content": [
                    { "id": "first", "title": "Uno" },
                    { "id": "second", "title": "Two" }
                ]
            })
        );
    }

    #[test]
    fn ensure_refuses_wrong_container() {
        let mut doc = json!({ "title": "Hello" });
        assert_eq!(
            ensure_path(&mut doc, &parse_patch_path("title[0]")).unwrap_err(),
            PathError::ExpectedArray("[0]".into())
        );
    }

    #[test]
    fn padding_is_bounded() {
        let mut doc = json!({ "tags": ["a"] });

        assert_eq!(
            ensure_path(&mut doc, &parse_patch_path("tags[18446744073709551615]")).unwrap_err(),
            PathError::IndexOutOfRange {
                index: usize::MAX,
                len: 1
            }
        );
        assert!(matches!(
            ensure_path(&mut doc, &parse_patch_path("tags.1000000000000.name")),
            Err(PathError::IndexOutOfRange { .. })
        ));
        assert_eq!(
            Key::Index(5000).set(&mut doc["tags"], json!("b")).unwrap_err(),
            PathError::IndexOutOfRange {
                index: 5000,
                len: 1
            }
        );
        assert_eq!(doc, json!({ "tags": ["a"] }));

        // Small gaps are still filled
        let (parent, key) = ensure_path(&mut doc, &parse_patch_path("tags[3]")).unwrap();
        key.set(parent, json!("d")).unwrap();
        assert_eq!(doc, json!({ "tags": ["a", null, null, "d"] }));
    }

    #[test]
    fn removes_values() {
        let mut doc = json!({ "items": [1, 2, 3] });
        let (parent, key) = get_by_segments(&mut doc, &parse_patch_path("items[1]")).unwrap();
        assert_eq!(key.remove(parent), Some(json!(2)));
        assert_eq!(doc, json!({ "items": [1, 3] }));
    }
}
