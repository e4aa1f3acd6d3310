//! Wrapper backed by a flattened pointer → location map.
//!
//! The map covers every live node (containers and scalars alike). A location
//! is the list of already validated steps from the root, so lookups skip
//! pointer parsing and index validation entirely; membership checks are a
//! single hash lookup.
//!
//! Map maintenance on writes:
//!
//! - replacing a container walks the old subtree and drops exactly its entries,
//! - writing a container sub-scans it and adds every descendant,
//! - removing a sequence element re-indexes the shifted siblings only.
//!
//! Every write validates before it mutates, so a failed `update` leaves both
//! the document and the map untouched.

use super::{
    ContentWrapper, Step, WrapperKind, clear_value, ensure_node_pointer, is_append, is_container,
    not_container_error, root_update_error,
};
use crate::{Error, Pointer, Result};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct IndexedWrapper {
    content: Value,
    node_map: HashMap<Pointer, Vec<Step>>,
}

impl IndexedWrapper {
    #[must_use]
    pub fn new(content: Value) -> Self {
        let mut wrapper = Self {
            content,
            node_map: HashMap::new(),
        };
        wrapper.recalculate();
        wrapper
    }

    /// Rebuild the node map from scratch. Required after the document was
    /// edited through [`content_mut`](Self::content_mut).
    pub fn recalculate(&mut self) {
        let mut node_map = HashMap::new();
        scan(&self.content, &Pointer::root(), &[], &mut node_map);
        log::trace!("Indexed {} nodes", node_map.len());
        self.node_map = node_map;
    }

    /// Mutable access that bypasses the node map; call
    /// [`recalculate`](Self::recalculate) afterwards.
    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    /// Number of indexed nodes (the root is not counted).
    #[must_use]
    pub fn indexed_nodes(&self) -> usize {
        self.node_map.len()
    }

    #[must_use]
    pub fn into_inner(self) -> Value {
        self.content
    }

    fn steps_of(&self, pointer: &Pointer) -> Option<&[Step]> {
        if pointer.is_root() {
            return Some(&[]);
        }
        self.node_map.get(pointer).map(Vec::as_slice)
    }

    fn stale_error(pointer: &Pointer) -> Error {
        Error::NotFound {
            pointer: pointer.to_string(),
            reason: "pointer refers to a non-existing node, or the document was modified \
                     directly (call recalculate() to restore integrity)"
                .to_string(),
        }
    }

    /// Drop the entries of every descendant of `value`, which lived at
    /// `pointer`. Only the removed subtree is walked.
    fn forget_descendants(&mut self, pointer: &Pointer, value: &Value) {
        forget(value, pointer, &mut self.node_map);
    }

    fn add_descendants(&mut self, pointer: &Pointer, steps: &[Step]) {
        if let Some(value) = follow(&self.content, steps) {
            scan(value, pointer, steps, &mut self.node_map);
        }
    }
}

fn follow<'a>(root: &'a Value, steps: &[Step]) -> Option<&'a Value> {
    steps.iter().try_fold(root, |node, step| match (node, step) {
        (Value::Object(map), Step::Key(key)) => map.get(key),
        (Value::Array(items), Step::Index(idx)) => items.get(*idx),
        _ => None,
    })
}

fn follow_mut<'a>(root: &'a mut Value, steps: &[Step]) -> Option<&'a mut Value> {
    steps.iter().try_fold(root, |node, step| match (node, step) {
        (Value::Object(map), Step::Key(key)) => map.get_mut(key),
        (Value::Array(items), Step::Index(idx)) => items.get_mut(*idx),
        _ => None,
    })
}

fn forget(value: &Value, pointer: &Pointer, out: &mut HashMap<Pointer, Vec<Step>>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                forget_node(child, &pointer.child(key.as_str()), out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                forget_node(child, &pointer.child(idx.to_string()), out);
            }
        }
        _ => {}
    }
}

fn forget_node(value: &Value, pointer: &Pointer, out: &mut HashMap<Pointer, Vec<Step>>) {
    forget(value, pointer, out);
    out.remove(pointer);
}

/// Add an entry for every descendant of `value`, which lives at `pointer`.
fn scan(value: &Value, pointer: &Pointer, steps: &[Step], out: &mut HashMap<Pointer, Vec<Step>>) {
    let children: Box<dyn Iterator<Item = (String, Step, &Value)> + '_> = match value {
        Value::Object(map) => Box::new(
            map.iter()
                .map(|(key, child)| (key.clone(), Step::Key(key.clone()), child)),
        ),
        Value::Array(items) => Box::new(
            items
                .iter()
                .enumerate()
                .map(|(idx, child)| (idx.to_string(), Step::Index(idx), child)),
        ),
        _ => return,
    };

    for (segment, step, child) in children {
        let child_pointer = pointer.child(segment);
        let mut child_steps = steps.to_vec();
        child_steps.push(step);
        if is_container(child) {
            scan(child, &child_pointer, &child_steps, out);
        }
        out.insert(child_pointer, child_steps);
    }
}

impl ContentWrapper for IndexedWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Indexed
    }

    fn content(&self) -> &Value {
        &self.content
    }

    fn get(&self, pointer: &Pointer) -> Result<&Value> {
        ensure_node_pointer(pointer)?;
        let steps = self
            .steps_of(pointer)
            .ok_or_else(|| Self::stale_error(pointer))?;
        follow(&self.content, steps).ok_or_else(|| Self::stale_error(pointer))
    }

    fn has(&self, pointer: &Pointer) -> bool {
        pointer.kind() != crate::PointerKind::File
            && (pointer.is_root() || self.node_map.contains_key(pointer))
    }

    fn update(&mut self, pointer: &Pointer, value: Value) -> Result<()> {
        ensure_node_pointer(pointer)?;
        if pointer.is_root() {
            return Err(root_update_error(pointer));
        }

        // Update case: the node exists, swap the value and re-index its subtree
        if let Some(steps) = self.node_map.get(pointer).cloned() {
            let slot = follow_mut(&mut self.content, &steps)
                .ok_or_else(|| Self::stale_error(pointer))?;
            let now_container = is_container(&value);
            let old = std::mem::replace(slot, value);

            if is_container(&old) {
                self.forget_descendants(pointer, &old);
            }
            if now_container {
                self.add_descendants(pointer, &steps);
            }
            log::trace!("Updated {pointer}");
            return Ok(());
        }

        // Add case: new map key or "-" append
        let parent_pointer = pointer.parent();
        let parent_steps = self
            .steps_of(&parent_pointer)
            .ok_or_else(|| Self::stale_error(pointer))?
            .to_vec();
        let last = pointer.last().unwrap_or_default().to_string();
        let now_container = is_container(&value);

        let parent = follow_mut(&mut self.content, &parent_steps)
            .ok_or_else(|| Self::stale_error(pointer))?;

        let (new_pointer, step) = match parent {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                (pointer.as_plain(), Step::Key(last))
            }
            Value::Array(items) if is_append(&last) => {
                items.push(value);
                let idx = items.len() - 1;
                (parent_pointer.child(idx.to_string()), Step::Index(idx))
            }
            Value::Array(items) => {
                return Err(Error::NotFound {
                    pointer: pointer.to_string(),
                    reason: format!(
                        "invalid or out of range sequence index \"{last}\" for node \"{parent_pointer}\" \
                         of length {}; use an in-range index or \"-\" to append",
                        items.len()
                    ),
                });
            }
            _ => return Err(not_container_error(pointer, parent_pointer.segments())),
        };

        let mut steps = parent_steps;
        steps.push(step);
        if now_container {
            self.add_descendants(&new_pointer, &steps);
        }
        self.node_map.insert(new_pointer, steps);
        log::trace!("Added {pointer}");
        Ok(())
    }

    fn delete(&mut self, pointer: &Pointer) -> bool {
        if pointer.kind() == crate::PointerKind::File {
            return false;
        }
        if pointer.is_root() {
            clear_value(&mut self.content);
            self.node_map.clear();
            return true;
        }

        let Some(steps) = self.node_map.get(pointer).cloned() else {
            return false;
        };
        let Some((last, parent_steps)) = steps.split_last() else {
            return false;
        };
        let Some(parent) = follow_mut(&mut self.content, parent_steps) else {
            return false;
        };

        match (parent, last) {
            (Value::Object(map), Step::Key(key)) => {
                let Some(old) = map.shift_remove(key.as_str()) else {
                    return false;
                };
                forget_node(&old, pointer, &mut self.node_map);
            }
            (Value::Array(items), Step::Index(idx)) if *idx < items.len() => {
                let idx = *idx;
                let parent_pointer = pointer.parent();
                // Siblings after the removed element shift left: re-index the tail only
                for (offset, item) in items[idx..].iter().enumerate() {
                    let item_pointer = parent_pointer.child((idx + offset).to_string());
                    forget_node(item, &item_pointer, &mut self.node_map);
                }
                items.remove(idx);
                let tail: Vec<(usize, bool)> = items[idx..]
                    .iter()
                    .enumerate()
                    .map(|(offset, item)| (idx + offset, is_container(item)))
                    .collect();
                for (position, container) in tail {
                    let child_pointer = parent_pointer.child(position.to_string());
                    let mut child_steps = parent_steps.to_vec();
                    child_steps.push(Step::Index(position));
                    if container {
                        self.add_descendants(&child_pointer, &child_steps);
                    }
                    self.node_map.insert(child_pointer, child_steps);
                }
            }
            _ => return false,
        }

        true
    }

    fn into_content(self: Box<Self>) -> Value {
        self.content
    }
}

impl PartialEq for IndexedWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}
