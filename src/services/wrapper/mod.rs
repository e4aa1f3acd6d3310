//! Pointer-addressed access to a wrapped document.
//!
//! Two interchangeable backends implement [`ContentWrapper`]:
//!
//! - [`DirectWrapper`] walks the document from the root on every call and
//!   caches nothing, so it always agrees with the document.
//! - [`IndexedWrapper`] keeps a flattened pointer → location map and patches
//!   it on every `update`/`delete`; callers that mutate the document behind
//!   its back must call `recalculate()`.
//!
//! Shared invariants:
//!
//! - Both backends MUST return identical `get`/`has` results after identical
//!   edit sequences (the direct backend is the oracle in tests).
//! - Sequence indices are canonical decimals (`0`, `17`); signs and leading
//!   zeros are rejected by both backends.
//! - `has` and `delete` never fail.

pub mod direct;
pub mod indexed;

pub use direct::DirectWrapper;
pub use indexed::IndexedWrapper;

use crate::models::pointer::{APPEND_CHAR, PointerKind};
use crate::{Error, Pointer, Result};
use serde_json::Value;

/// Enumeration of available wrapper backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapperKind {
    /// Walks the document on every call.
    #[default]
    Direct,
    /// Flattened node map with O(1) membership checks.
    Indexed,
}

impl WrapperKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WrapperKind::Direct => "direct",
            WrapperKind::Indexed => "indexed",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "direct" => Some(WrapperKind::Direct),
            "indexed" | "fast" | "flat" => Some(WrapperKind::Indexed),
            _ => None,
        }
    }

    /// Wrap a document with the selected backend.
    #[must_use]
    pub fn wrap(self, content: Value) -> Box<dyn ContentWrapper> {
        match self {
            WrapperKind::Direct => Box::new(DirectWrapper::new(content)),
            WrapperKind::Indexed => Box::new(IndexedWrapper::new(content)),
        }
    }
}

impl std::fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WrapperKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WrapperKind::from_label(s).ok_or_else(|| format!("unknown wrapper '{s}'"))
    }
}

/// Common interface implemented by document wrappers.
pub trait ContentWrapper {
    /// Identify the backend for logging and diagnostics.
    fn kind(&self) -> WrapperKind;

    /// Borrow the whole document.
    fn content(&self) -> &Value;

    /// Value at `pointer`; the root pointer yields the whole document.
    fn get(&self, pointer: &Pointer) -> Result<&Value>;

    /// Whether `pointer` addresses an existing node.
    fn has(&self, pointer: &Pointer) -> bool;

    /// Value at `pointer`, or `default` when the node is missing.
    fn get_or_default<'a>(&'a self, pointer: &Pointer, default: &'a Value) -> &'a Value {
        self.get(pointer).unwrap_or(default)
    }

    /// Replace or create the node at `pointer`.
    ///
    /// Missing map keys are created, `-` appends to a sequence, an in-range
    /// index replaces. The root cannot be updated.
    fn update(&mut self, pointer: &Pointer, value: Value) -> Result<()>;

    /// Remove the node at `pointer`; the root clears the whole document.
    /// Returns false (and changes nothing) when the node does not exist.
    fn delete(&mut self, pointer: &Pointer) -> bool;

    /// Lazily iterate `(pointer, scalar)` pairs for every leaf in document order.
    fn iterate(&self) -> Leaves<'_> {
        Leaves::new(self.content())
    }

    /// Unwrap the document.
    fn into_content(self: Box<Self>) -> Value;
}

/// One resolved step from a container to its child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Key(String),
    Index(usize),
}

/// Parse a sequence index token.
pub(crate) fn parse_index(token: &str) -> Option<usize> {
    let canonical = token == "0" || (!token.starts_with('0') && !token.is_empty());
    if !canonical || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

pub(crate) fn is_append(token: &str) -> bool {
    token == APPEND_CHAR
}

pub(crate) fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Reject pointers that do not address document nodes.
pub(crate) fn ensure_node_pointer(pointer: &Pointer) -> Result<()> {
    if pointer.kind() == PointerKind::File {
        return Err(Error::InvalidOperation {
            pointer: pointer.to_string(),
            reason: "file pointers do not address document nodes".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn root_update_error(pointer: &Pointer) -> Error {
    Error::InvalidOperation {
        pointer: pointer.to_string(),
        reason: "direct root modification is not allowed, a non-root pointer is required"
            .to_string(),
    }
}

pub(crate) fn not_container_error(pointer: &Pointer, at: &[String]) -> Error {
    Error::InvalidOperation {
        pointer: pointer.to_string(),
        reason: format!(
            "node \"{}\" is not a map or sequence",
            Pointer::from_segments(at.iter().cloned())
        ),
    }
}

/// Empty the document in place, keeping its container type.
pub(crate) fn clear_value(value: &mut Value) {
    match value {
        Value::Object(map) => map.clear(),
        Value::Array(items) => items.clear(),
        other => *other = Value::Null,
    }
}

/// Lazy depth-first iterator over scalar leaves.
pub struct Leaves<'a> {
    stack: Vec<(Pointer, &'a Value)>,
}

impl<'a> Leaves<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self {
            stack: vec![(Pointer::root(), root)],
        }
    }
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Pointer, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((pointer, value)) = self.stack.pop() {
            match value {
                Value::Object(map) => {
                    for (key, child) in map.iter().rev() {
                        self.stack.push((pointer.child(key.as_str()), child));
                    }
                }
                Value::Array(items) => {
                    for (idx, child) in items.iter().enumerate().rev() {
                        self.stack.push((pointer.child(idx.to_string()), child));
                    }
                }
                scalar => return Some((pointer, scalar)),
            }
        }
        None
    }
}
