//! Single-pass resolution of string directives.
//!
//! Any string of the form `"!ref /path"` or `"!file path/to/file"` is
//! replaced by the referenced value, which is resolved first. Unlike the
//! composer there is no retry: a target that does not exist is an error.

use crate::io::DataReader;
use crate::models::pointer::FILE_PREFIX;
use crate::services::wrapper::ContentWrapper;
use crate::{ChainLink, Error, Pointer, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

const BY_REF_CONTEXT: &str = "<by ref>";
const FROM_FILE_CONTEXT: &str = "<from file>";

/// Resolver for `!ref` / `!file` strings with optional memoization.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache_enabled: bool,
    reader: DataReader,
    ref_cache: HashMap<String, Value>,
    file_cache: HashMap<String, Value>,
    /// Directives in progress with the node path that requested each.
    stack: Vec<ChainLink>,
    /// Node names from the resolution entry point down to the current value.
    node_stack: Vec<String>,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new(enable_cache: bool) -> Self {
        Self {
            cache_enabled: enable_cache,
            ..Self::default()
        }
    }

    /// Resolve relative file paths against `base_dir`.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.reader = DataReader::new(base_dir);
        self
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Resolve every directive of the document. Top-level children are
    /// written back one by one, so later lookups see earlier results.
    pub fn resolve_all(&mut self, content: &mut dyn ContentWrapper) -> Result<()> {
        let children: Vec<Pointer> = match content.content() {
            Value::Object(map) => map
                .keys()
                .map(|key| Pointer::root().child(key.as_str()))
                .collect(),
            Value::Array(items) => (0..items.len())
                .map(|idx| Pointer::root().child(idx.to_string()))
                .collect(),
            _ => return Ok(()),
        };
        log::debug!("Resolving {} top-level node(s)", children.len());

        for pointer in children {
            let value = content.get(&pointer)?.clone();
            let context = pointer.last().unwrap_or_default().to_string();
            let resolved = self.resolve(&*content, value, &context)?;
            content.update(&pointer, resolved)?;
        }
        Ok(())
    }

    /// Resolve `value` against `document`. `node_context` names the node the
    /// value belongs to and only shows up in error messages.
    pub fn resolve(
        &mut self,
        document: &dyn ContentWrapper,
        value: Value,
        node_context: &str,
    ) -> Result<Value> {
        self.node_stack.push(node_context.to_string());
        let result = self.resolve_value(document, value);
        self.node_stack.pop();
        result
    }

    pub fn invalidate_cache(&mut self) {
        self.ref_cache.clear();
        self.file_cache.clear();
    }

    fn resolve_value(&mut self, document: &dyn ContentWrapper, value: Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                let mut resolved = Map::with_capacity(map.len());
                for (key, item) in map {
                    let item = self.resolve(document, item, &key)?;
                    resolved.insert(key, item);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| self.resolve(document, item, &idx.to_string()))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::String(raw) if Pointer::is_reference_syntax(&raw) => {
                self.resolve_reference(document, &raw)
            }
            Value::String(raw) if Pointer::is_file_syntax(&raw) => {
                self.resolve_file(document, &raw)
            }
            other => Ok(other),
        }
    }

    fn resolve_reference(&mut self, document: &dyn ContentWrapper, raw: &str) -> Result<Value> {
        let pointer = Pointer::parse(raw)?;
        let key = pointer.to_string();
        if self.cache_enabled {
            if let Some(cached) = self.ref_cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        self.enter("Reference", &key)?;
        let result = document
            .get(&pointer)
            .map(Value::clone)
            .map_err(|source| self.resolution_error(raw, source))
            .and_then(|value| {
                let context = format!("{BY_REF_CONTEXT}{}", pointer.as_plain());
                self.resolve(document, value, &context)
            });
        self.stack.pop();

        let value = result?;
        if self.cache_enabled {
            self.ref_cache.insert(key, value.clone());
        }
        Ok(value)
    }

    fn resolve_file(&mut self, document: &dyn ContentWrapper, raw: &str) -> Result<Value> {
        let pointer = Pointer::parse(raw)?;
        let path = pointer.file_path().unwrap_or_default();
        let key = self.reader.cache_key(path);
        if self.cache_enabled {
            if let Some(cached) = self.file_cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        self.enter("File", &format!("{FILE_PREFIX}{key}"))?;
        let result = self
            .reader
            .read(path, None)
            .map_err(|source| self.resolution_error(raw, source))
            .and_then(|content| self.resolve(document, content, FROM_FILE_CONTEXT));
        self.stack.pop();

        let value = result?;
        if self.cache_enabled {
            self.file_cache.insert(key, value.clone());
        }
        Ok(value)
    }

    /// Push a directive onto the stack, failing if it is already in progress.
    fn enter(&mut self, kind: &'static str, target: &str) -> Result<()> {
        let link = ChainLink {
            node: self.node_path(),
            target: target.to_string(),
        };
        if self.stack.iter().any(|frame| frame.target == target) {
            let mut chain = self.stack.clone();
            chain.push(link);
            return Err(Error::Cycle {
                kind,
                target: target.to_string(),
                chain,
            });
        }
        self.stack.push(link);
        Ok(())
    }

    fn node_path(&self) -> String {
        self.node_stack
            .iter()
            .filter(|segment| !segment.is_empty())
            .fold(String::new(), |mut path, segment| {
                path.push('/');
                path.push_str(segment);
                path
            })
    }

    fn resolution_error(&self, raw: &str, source: Error) -> Error {
        Error::Resolution {
            directive: raw.to_string(),
            node_path: self.node_path(),
            source: Box::new(source),
        }
    }
}
