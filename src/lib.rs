//! Pointer-addressed JSON document engine
//!
//! This library wraps parsed JSON documents behind RFC 6901 pointers and
//! expands embedded directives (references, file includes, value generators,
//! matchers) into concrete values, either through the iterative
//! [`Composer`](services::compose::Composer) or the single-pass string
//! directive [`ReferenceResolver`](services::resolve::ReferenceResolver).

pub mod cli;
pub mod document;
pub mod io;
pub mod models;
pub mod services;

pub use document::{DocumentBuilder, JsonDocument};
pub use models::{ChainLink, Pointer, PointerKind, StuckNode};
pub use services::compose::{Composer, CompositionStatus, HandlerRegistry};
pub use services::generators::GeneratorRegistry;
pub use services::matchers::MatcherRegistry;
pub use services::resolve::ReferenceResolver;
pub use services::wrapper::{ContentWrapper, DirectWrapper, IndexedWrapper, WrapperKind};

use models::render_lines;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::result;
use std::sync::Arc;

/// Custom error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid pointer syntax \"{input}\": {reason}")]
    Syntax { input: String, reason: String },

    #[error("Failed to find value by \"{pointer}\": {reason}")]
    NotFound { pointer: String, reason: String },

    #[error("Invalid operation at \"{pointer}\": {reason}")]
    InvalidOperation { pointer: String, reason: String },

    #[error(
        "Recursion detected! {kind} \"{target}\" already in the stack.\nFull stack:\n{}",
        render_lines(.chain)
    )]
    Cycle {
        kind: &'static str,
        target: String,
        chain: Vec<ChainLink>,
    },

    #[error(
        "Unresolved compositions remain for nodes:\n{}\nPossible causes: references to \
         non-existent nodes, recursive references or an unresolvable reference order",
        render_lines(.nodes)
    )]
    Unresolvable { nodes: Vec<StuckNode> },

    #[error("Failed to resolve \"{directive}\" at node \"{node_path}\": {source}")]
    Resolution {
        directive: String,
        node_path: String,
        source: Box<Error>,
    },

    #[error("Error occurred on composing value at pointer \"{pointer}\": {source}")]
    Composition { pointer: String, source: Box<Error> },

    #[error("Generator \"{name}\": {reason}")]
    Generator { name: String, reason: String },

    #[error("Matcher \"{name}\": {reason}")]
    Matcher { name: String, reason: String },

    #[error("I/O error for \"{path}\": {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse \"{path}\": {message}")]
    Parse { path: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Innermost error, skipping composition/resolution wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Composition { source, .. } | Error::Resolution { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Options for composing a document with structured directives
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub wrapper: WrapperKind,
    pub file_cache: bool,
    pub base_dir: Option<PathBuf>,
    pub max_context_depth: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            wrapper: WrapperKind::Indexed,
            file_cache: false,
            base_dir: None,
            max_context_depth: services::compose::DEFAULT_MAX_CONTEXT_DEPTH,
        }
    }
}

/// Options for resolving a document with string directives
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub wrapper: WrapperKind,
    pub enable_cache: bool,
    pub base_dir: Option<PathBuf>,
}

/// Compose an already parsed document using the built-in generators and matchers.
///
/// # Arguments
/// * `content` - The parsed document (map or sequence)
/// * `opts` - Compose options
///
/// # Returns
/// The fully composed document, or the first fatal error
pub fn compose_value(content: Value, opts: &ComposeOptions) -> Result<Value> {
    let handlers = HandlerRegistry::standard(
        Arc::new(GeneratorRegistry::with_builtins()),
        Arc::new(MatcherRegistry::with_builtins()),
        opts.file_cache,
        opts.base_dir.clone(),
    );

    let mut composer = Composer::new(opts.wrapper.wrap(content), handlers)
        .with_max_context_depth(opts.max_context_depth);
    composer.compose()?;
    Ok(composer.into_content())
}

/// Read a JSON/YAML file and compose it.
pub fn compose_file<P: AsRef<Path>>(path: P, opts: &ComposeOptions) -> Result<Value> {
    let content = io::data_reader::DataReader::default().read_path(path.as_ref(), None)?;
    ensure_container(&content, path.as_ref())?;
    compose_value(content, opts)
}

/// Resolve string directives of an already parsed document.
pub fn resolve_value(content: Value, opts: &ResolveOptions) -> Result<Value> {
    let mut wrapper = opts.wrapper.wrap(content);
    let mut resolver =
        ReferenceResolver::new(opts.enable_cache).with_base_dir(opts.base_dir.clone());
    resolver.resolve_all(wrapper.as_mut())?;
    Ok(wrapper.into_content())
}

/// Read a JSON/YAML file and resolve its string directives.
pub fn resolve_file<P: AsRef<Path>>(path: P, opts: &ResolveOptions) -> Result<Value> {
    let content = io::data_reader::DataReader::default().read_path(path.as_ref(), None)?;
    ensure_container(&content, path.as_ref())?;
    resolve_value(content, opts)
}

fn ensure_container(content: &Value, path: &Path) -> Result<()> {
    if content.is_object() || content.is_array() {
        return Ok(());
    }
    Err(Error::InvalidInput(format!(
        "Document must be a map or a sequence: {}",
        path.display()
    )))
}
