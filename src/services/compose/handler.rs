//! Handler trait and the ordered registry used by the composer.

use super::file::{FileReferenceHandler, IncludeFileHandler};
use super::reference::{ExtendedReferenceHandler, ReferenceHandler};
use super::registered::{GeneratorHandler, MatcherHandler};
use crate::services::generators::GeneratorRegistry;
use crate::services::matchers::MatcherRegistry;
use crate::services::wrapper::ContentWrapper;
use crate::{Error, Pointer, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of a single handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionStatus {
    /// Value replaces the node; containers are rescanned on the next pass.
    Success,
    /// Node left untouched and retried on the next pass.
    Retry,
    /// Value replaces the node and is never scanned again.
    Completed,
    /// Value is composed to its own fixpoint before it replaces the node.
    ComposeInSeparateContext,
}

impl CompositionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionStatus::Success => "success",
            CompositionStatus::Retry => "retry",
            CompositionStatus::Completed => "completed",
            CompositionStatus::ComposeInSeparateContext => "separate-context",
        }
    }
}

impl std::fmt::Display for CompositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view handed to handlers while a directive is composed.
pub struct CompositionContext<'a> {
    /// Document being composed.
    pub document: &'a dyn ContentWrapper,
    /// Node holding the directive.
    pub pointer: &'a Pointer,
    markers: &'a [&'static str],
}

impl<'a> CompositionContext<'a> {
    #[must_use]
    pub fn new(
        document: &'a dyn ContentWrapper,
        pointer: &'a Pointer,
        markers: &'a [&'static str],
    ) -> Self {
        Self {
            document,
            pointer,
            markers,
        }
    }

    /// Whether `value` is a directive any registered handler would pick up.
    #[must_use]
    pub fn is_directive(&self, value: &Value) -> bool {
        is_directive(value, self.markers)
    }
}

pub(crate) fn is_directive(value: &Value, markers: &[&'static str]) -> bool {
    match value {
        Value::Object(map) => markers.iter().any(|marker| map.contains_key(*marker)),
        _ => false,
    }
}

/// Converts one kind of directive into a concrete value.
pub trait CompositionHandler {
    /// Identify the handler for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Key that marks a directive of this kind.
    fn marker(&self) -> &'static str;

    /// Whether the map is a directive this handler understands.
    fn matches(&self, directive: &Map<String, Value>) -> bool {
        directive.contains_key(self.marker())
    }

    /// Resolve the directive. The value is ignored on `Retry`.
    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)>;

    /// Drop any memoized results.
    fn invalidate_cache(&mut self) {}
}

/// Ordered handler set; the first matching handler wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn CompositionHandler>>,
}

impl HandlerRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Default handler set: references, files, generators and matchers.
    #[must_use]
    pub fn standard(
        generators: Arc<GeneratorRegistry>,
        matchers: Arc<MatcherRegistry>,
        file_cache: bool,
        base_dir: Option<PathBuf>,
    ) -> Self {
        Self::new()
            .with(ReferenceHandler)
            .with(ExtendedReferenceHandler)
            .with(FileReferenceHandler::new(file_cache, base_dir.clone()))
            .with(IncludeFileHandler::new(file_cache, base_dir))
            .with(GeneratorHandler::new(generators))
            .with(MatcherHandler::new(matchers))
    }

    /// Register a handler after the existing ones.
    pub fn register(&mut self, handler: impl CompositionHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    #[must_use]
    pub fn with(mut self, handler: impl CompositionHandler + 'static) -> Self {
        self.register(handler);
        self
    }

    /// First handler matching the directive.
    #[must_use]
    pub fn find(&self, directive: &Map<String, Value>) -> Option<&dyn CompositionHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.matches(directive))
            .map(|handler| &**handler)
    }

    pub fn find_mut(
        &mut self,
        directive: &Map<String, Value>,
    ) -> Option<&mut Box<dyn CompositionHandler>> {
        self.handlers
            .iter_mut()
            .find(|handler| handler.matches(directive))
    }

    /// Marker keys of every registered handler, in registration order.
    #[must_use]
    pub fn markers(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.marker()).collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub fn invalidate_caches(&mut self) {
        for handler in &mut self.handlers {
            handler.invalidate_cache();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Directive option, accepting both the `$name` and the `!name` spelling.
pub(crate) fn directive_option<'a>(
    directive: &'a Map<String, Value>,
    name: &str,
) -> Option<&'a Value> {
    directive
        .get(&format!("${name}"))
        .or_else(|| directive.get(&format!("!{name}")))
}

/// Whether `key` is one of the spellings of the given options.
pub(crate) fn is_option_key(key: &str, names: &[&str]) -> bool {
    key.strip_prefix('$')
        .or_else(|| key.strip_prefix('!'))
        .is_some_and(|bare| names.contains(&bare))
}

/// The marker payload as a string.
pub(crate) fn string_payload<'a>(
    directive: &'a Map<String, Value>,
    marker: &str,
) -> Result<&'a str> {
    match directive.get(marker) {
        Some(Value::String(raw)) => Ok(raw),
        Some(other) => Err(Error::InvalidInput(format!(
            "\"{marker}\" expects a string, got {other}"
        ))),
        None => Err(Error::InvalidInput(format!("\"{marker}\" is missing"))),
    }
}
