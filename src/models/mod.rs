//! Data models for pointers and composition diagnostics

pub mod pointer;

pub use pointer::{Pointer, PointerKind};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A node left unresolved when composition stopped making progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StuckNode {
    pub pointer: String,
    pub value: Value,
}

impl fmt::Display for StuckNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- node \"{}\", current value: {}", self.pointer, self.value)
    }
}

/// One level of a reference chain: the node being resolved and the
/// directive it was resolving at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub node: String,
    pub target: String,
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node \"{}\" -> \"{}\"", self.node, self.target)
    }
}

pub(crate) fn render_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
