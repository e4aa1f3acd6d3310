//! Wrapper that walks the document from the root on every call.

use super::{
    ContentWrapper, WrapperKind, clear_value, ensure_node_pointer, is_append, not_container_error,
    parse_index, root_update_error,
};
use crate::{Error, Pointer, Result};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectWrapper {
    content: Value,
}

impl DirectWrapper {
    #[must_use]
    pub fn new(content: Value) -> Self {
        Self { content }
    }

    /// Mutable access to the document. Nothing is cached, so edits made here
    /// are visible to the next call.
    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    #[must_use]
    pub fn into_inner(self) -> Value {
        self.content
    }
}

/// Resolve `pointer` inside an arbitrary value.
pub fn resolve_in<'a>(root: &'a Value, pointer: &Pointer) -> Result<&'a Value> {
    ensure_node_pointer(pointer)?;
    walk(root, pointer, pointer.segments())
}

fn walk<'a>(root: &'a Value, pointer: &Pointer, segments: &[String]) -> Result<&'a Value> {
    let mut node = root;
    for (depth, segment) in segments.iter().enumerate() {
        node = match node {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| missing_key(pointer, &segments[..depth], segment))?,
            Value::Array(items) => {
                let idx = parse_index(segment)
                    .ok_or_else(|| invalid_index(pointer, &segments[..depth], segment))?;
                let len = items.len();
                items
                    .get(idx)
                    .ok_or_else(|| index_out_of_range(pointer, &segments[..depth], idx, len))?
            }
            _ => return Err(not_container_lookup(pointer, &segments[..depth])),
        };
    }
    Ok(node)
}

fn walk_mut<'a>(
    root: &'a mut Value,
    pointer: &Pointer,
    segments: &[String],
) -> Result<&'a mut Value> {
    let mut node = root;
    for (depth, segment) in segments.iter().enumerate() {
        node = match node {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| missing_key(pointer, &segments[..depth], segment))?,
            Value::Array(items) => {
                let idx = parse_index(segment)
                    .ok_or_else(|| invalid_index(pointer, &segments[..depth], segment))?;
                let len = items.len();
                items
                    .get_mut(idx)
                    .ok_or_else(|| index_out_of_range(pointer, &segments[..depth], idx, len))?
            }
            _ => return Err(not_container_lookup(pointer, &segments[..depth])),
        };
    }
    Ok(node)
}

impl ContentWrapper for DirectWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Direct
    }

    fn content(&self) -> &Value {
        &self.content
    }

    fn get(&self, pointer: &Pointer) -> Result<&Value> {
        resolve_in(&self.content, pointer)
    }

    fn has(&self, pointer: &Pointer) -> bool {
        resolve_in(&self.content, pointer).is_ok()
    }

    fn update(&mut self, pointer: &Pointer, value: Value) -> Result<()> {
        ensure_node_pointer(pointer)?;
        let Some((last, parent_path)) = pointer.segments().split_last() else {
            return Err(root_update_error(pointer));
        };

        let parent = walk_mut(&mut self.content, pointer, parent_path)?;
        match parent {
            Value::Object(map) => {
                map.insert(last.clone(), value);
            }
            Value::Array(items) if is_append(last) => items.push(value),
            Value::Array(items) => {
                let idx = parse_index(last)
                    .ok_or_else(|| invalid_index(pointer, parent_path, last))?;
                let len = items.len();
                let slot = items
                    .get_mut(idx)
                    .ok_or_else(|| index_out_of_range(pointer, parent_path, idx, len))?;
                *slot = value;
            }
            _ => return Err(not_container_error(pointer, parent_path)),
        }

        log::trace!("Updated {pointer}");
        Ok(())
    }

    fn delete(&mut self, pointer: &Pointer) -> bool {
        if ensure_node_pointer(pointer).is_err() {
            return false;
        }
        let Some((last, parent_path)) = pointer.segments().split_last() else {
            clear_value(&mut self.content);
            return true;
        };

        let Ok(parent) = walk_mut(&mut self.content, pointer, parent_path) else {
            return false;
        };

        match parent {
            Value::Object(map) => map.shift_remove(last.as_str()).is_some(),
            Value::Array(items) => match parse_index(last) {
                Some(idx) if idx < items.len() => {
                    items.remove(idx);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn into_content(self: Box<Self>) -> Value {
        self.content
    }
}

fn missing_key(pointer: &Pointer, at: &[String], key: &str) -> Error {
    Error::NotFound {
        pointer: pointer.to_string(),
        reason: format!(
            "key \"{key}\" is not present in node \"{}\"",
            Pointer::from_segments(at.iter().cloned())
        ),
    }
}

fn invalid_index(pointer: &Pointer, at: &[String], token: &str) -> Error {
    Error::NotFound {
        pointer: pointer.to_string(),
        reason: format!(
            "invalid sequence index \"{token}\" at node \"{}\"; index must be a non-negative \
             integer in range (or \"-\" to append on update)",
            Pointer::from_segments(at.iter().cloned())
        ),
    }
}

fn index_out_of_range(pointer: &Pointer, at: &[String], idx: usize, len: usize) -> Error {
    Error::NotFound {
        pointer: pointer.to_string(),
        reason: format!(
            "index {idx} is out of range for node \"{}\" of length {len}",
            Pointer::from_segments(at.iter().cloned())
        ),
    }
}

fn not_container_lookup(pointer: &Pointer, at: &[String]) -> Error {
    Error::NotFound {
        pointer: pointer.to_string(),
        reason: format!(
            "node \"{}\" is not a map or sequence",
            Pointer::from_segments(at.iter().cloned())
        ),
    }
}
