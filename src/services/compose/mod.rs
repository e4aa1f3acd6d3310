//! Fixpoint composition of structured directives.
//!
//! Every pass scans the nodes on the worklist, hands each directive to the
//! first matching handler and writes the result back through the wrapper.
//! Nodes that retried, or received a container that may hold further
//! directives, form the next worklist. Composition stops when the worklist
//! drains and fails when a pass changes nothing and leaves the very same
//! worklist behind.

pub mod file;
pub mod handler;
pub mod reference;
pub mod registered;

pub use handler::{CompositionContext, CompositionHandler, CompositionStatus, HandlerRegistry};

use crate::services::wrapper::ContentWrapper;
use crate::{Error, Pointer, Result, StuckNode};
use handler::is_directive;
use serde_json::Value;
use std::collections::HashSet;

/// Default cap on nested `$compose` includes.
pub const DEFAULT_MAX_CONTEXT_DEPTH: usize = 32;

/// Whether a subtree still has work left after a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Revisit,
}

impl Outcome {
    fn merge(self, other: Outcome) -> Outcome {
        if self == Outcome::Revisit || other == Outcome::Revisit {
            Outcome::Revisit
        } else {
            Outcome::Done
        }
    }
}

/// Mutable state of one pass.
#[derive(Debug, Default)]
struct Pass {
    revisit: Vec<Pointer>,
    changed: bool,
}

/// Expands directives of a wrapped document in place.
pub struct Composer {
    content: Box<dyn ContentWrapper>,
    handlers: HandlerRegistry,
    markers: Vec<&'static str>,
    completed: HashSet<Pointer>,
    max_context_depth: usize,
    depth: usize,
}

impl Composer {
    #[must_use]
    pub fn new(content: Box<dyn ContentWrapper>, handlers: HandlerRegistry) -> Self {
        let markers = handlers.markers();
        Self {
            content,
            handlers,
            markers,
            completed: HashSet::new(),
            max_context_depth: DEFAULT_MAX_CONTEXT_DEPTH,
            depth: 0,
        }
    }

    #[must_use]
    pub fn with_max_context_depth(mut self, depth: usize) -> Self {
        self.max_context_depth = depth;
        self
    }

    #[must_use]
    pub fn content(&self) -> &dyn ContentWrapper {
        self.content.as_ref()
    }

    #[must_use]
    pub fn into_content(self) -> Value {
        self.content.into_content()
    }

    /// Forget completed nodes and every handler cache, including generator
    /// correlation ids.
    pub fn invalidate_cache(&mut self) {
        self.completed.clear();
        self.handlers.invalidate_caches();
    }

    /// Compose the whole document.
    pub fn compose(&mut self) -> Result<()> {
        self.compose_at(&Pointer::root())
    }

    /// Compose the subtree at `start` until no directive is left in it.
    pub fn compose_at(&mut self, start: &Pointer) -> Result<()> {
        let mut worklist = vec![start.as_plain()];
        let mut passes = 0usize;

        while !worklist.is_empty() {
            passes += 1;
            log::debug!(
                "Composition pass {passes} over {} node(s) ({} wrapper)",
                worklist.len(),
                self.content.kind()
            );

            let mut pass = Pass::default();
            for pointer in &worklist {
                if !self.content.has(pointer) {
                    log::trace!("Skipping vanished node {pointer}");
                    continue;
                }
                let value = self.content.get(pointer)?.clone();
                self.scan(pointer, &value, &mut pass)?;
            }

            let next = normalize(pass.revisit);
            if !next.is_empty() && next == worklist && !pass.changed {
                return Err(Error::Unresolvable {
                    nodes: next
                        .iter()
                        .map(|pointer| StuckNode {
                            pointer: pointer.to_string(),
                            value: self.content.get_or_default(pointer, &Value::Null).clone(),
                        })
                        .collect(),
                });
            }
            worklist = next;
        }

        log::debug!("Composition finished after {passes} pass(es)");
        Ok(())
    }

    fn scan(&mut self, pointer: &Pointer, value: &Value, pass: &mut Pass) -> Result<Outcome> {
        if self.completed.contains(pointer) {
            return Ok(Outcome::Done);
        }

        match value {
            Value::Object(map) if is_directive(value, &self.markers) => {
                if pointer.is_root() {
                    return Err(Error::InvalidOperation {
                        pointer: pointer.to_string(),
                        reason: "a directive cannot replace the whole document".to_string(),
                    });
                }

                // Payload first: nested directives must be concrete before this one runs
                let mut nested = Outcome::Done;
                for (key, child) in map {
                    nested = nested.merge(self.scan(&pointer.child(key.as_str()), child, pass)?);
                }
                if nested == Outcome::Revisit {
                    pass.revisit.push(pointer.clone());
                    return Ok(Outcome::Revisit);
                }

                self.invoke(pointer, pass)
            }
            Value::Object(map) => {
                let mut outcome = Outcome::Done;
                for (key, child) in map {
                    outcome = outcome.merge(self.scan(&pointer.child(key.as_str()), child, pass)?);
                }
                Ok(outcome)
            }
            Value::Array(items) => {
                let mut outcome = Outcome::Done;
                for (idx, child) in items.iter().enumerate() {
                    let child_pointer = pointer.child(idx.to_string());
                    outcome = outcome.merge(self.scan(&child_pointer, child, pass)?);
                }
                Ok(outcome)
            }
            _ => Ok(Outcome::Done),
        }
    }

    /// Run the handler for the directive currently stored at `pointer`.
    fn invoke(&mut self, pointer: &Pointer, pass: &mut Pass) -> Result<Outcome> {
        // Re-read: composing the payload may have rewritten parts of it
        let Value::Object(directive) = self.content.get(pointer)?.clone() else {
            return Ok(Outcome::Done);
        };

        let ctx = CompositionContext::new(self.content.as_ref(), pointer, &self.markers);
        let Some(handler) = self.handlers.find_mut(&directive) else {
            return Ok(Outcome::Done);
        };
        let name = handler.name();
        let (status, value) = handler
            .compose(&directive, &ctx)
            .map_err(|source| Error::Composition {
                pointer: pointer.to_string(),
                source: Box::new(source),
            })?;
        log::trace!("{name} at {pointer}: {status}");

        match status {
            CompositionStatus::Retry => {
                pass.revisit.push(pointer.clone());
                Ok(Outcome::Revisit)
            }
            CompositionStatus::Success => {
                let container = value.is_object() || value.is_array();
                self.apply(pointer, value, pass)?;
                if container {
                    pass.revisit.push(pointer.clone());
                    return Ok(Outcome::Revisit);
                }
                Ok(Outcome::Done)
            }
            CompositionStatus::Completed => {
                self.apply(pointer, value, pass)?;
                self.completed.insert(pointer.clone());
                Ok(Outcome::Done)
            }
            CompositionStatus::ComposeInSeparateContext => {
                let composed = self
                    .compose_separately(value)
                    .map_err(|source| Error::Composition {
                        pointer: pointer.to_string(),
                        source: Box::new(source),
                    })?;
                self.apply(pointer, composed, pass)?;
                self.completed.insert(pointer.clone());
                Ok(Outcome::Done)
            }
        }
    }

    fn apply(&mut self, pointer: &Pointer, value: Value, pass: &mut Pass) -> Result<()> {
        if self.content.get(pointer).is_ok_and(|current| *current == value) {
            return Ok(());
        }
        self.completed.remove(pointer);
        if !self.completed.is_empty() {
            self.completed.retain(|done| !done.is_child_of(pointer));
        }
        self.content.update(pointer, value)?;
        pass.changed = true;
        Ok(())
    }

    /// Compose `value` to its own fixpoint with this composer's handlers.
    fn compose_separately(&mut self, value: Value) -> Result<Value> {
        if self.depth >= self.max_context_depth {
            return Err(Error::InvalidOperation {
                pointer: Pointer::root().to_string(),
                reason: format!(
                    "separate composition contexts nested deeper than {} levels",
                    self.max_context_depth
                ),
            });
        }

        let mut child = Composer {
            content: self.content.kind().wrap(value),
            handlers: std::mem::take(&mut self.handlers),
            markers: self.markers.clone(),
            completed: HashSet::new(),
            max_context_depth: self.max_context_depth,
            depth: self.depth + 1,
        };
        log::debug!("Composing included content at depth {}", child.depth);

        let result = child.compose();
        let Composer {
            content, handlers, ..
        } = child;
        self.handlers = handlers;
        result?;
        Ok(content.into_content())
    }
}

/// Deduplicate while keeping order and drop pointers nested in another entry.
fn normalize(pointers: Vec<Pointer>) -> Vec<Pointer> {
    let mut seen = HashSet::new();
    let unique: Vec<Pointer> = pointers
        .into_iter()
        .filter(|pointer| seen.insert(pointer.clone()))
        .collect();

    // Sorted by path, descendants directly follow their ancestor
    let mut sorted: Vec<&Pointer> = unique.iter().collect();
    sorted.sort_unstable_by(|a, b| a.segments().cmp(b.segments()));
    let mut nested = HashSet::new();
    let mut last_kept: Option<&Pointer> = None;
    for pointer in sorted {
        match last_kept {
            Some(ancestor) if pointer.is_child_of(ancestor) => {
                nested.insert(pointer.clone());
            }
            _ => last_kept = Some(pointer),
        }
    }

    unique
        .into_iter()
        .filter(|pointer| !nested.contains(pointer))
        .collect()
}
