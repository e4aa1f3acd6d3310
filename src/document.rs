//! String-pointer facade over a wrapped document
//!
//! [`JsonDocument`] couples a [`ContentWrapper`] with an optional
//! [`ReferenceResolver`]: when references are allowed, `!ref`/`!file`
//! strings are resolved once on construction and again for every value
//! written through [`JsonDocument::update`].

use crate::io::DataReader;
use crate::services::resolve::ReferenceResolver;
use crate::services::wrapper::{ContentWrapper, Leaves, WrapperKind};
use crate::{Error, Pointer, Result};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

const UPDATE_CONTEXT: &str = "<update>";

pub struct JsonDocument {
    content: Box<dyn ContentWrapper>,
    resolver: Option<ReferenceResolver>,
}

impl JsonDocument {
    /// Wrap a map or sequence with the default backend and no reference
    /// resolution.
    pub fn new(content: Value) -> Result<Self> {
        DocumentBuilder::new().from_data(content).build()
    }

    /// Whether `pointer` addresses an existing node. Malformed pointers are
    /// simply absent.
    #[must_use]
    pub fn has(&self, pointer: &str) -> bool {
        Pointer::parse(pointer).is_ok_and(|pointer| self.content.has(&pointer))
    }

    pub fn get(&self, pointer: &str) -> Result<&Value> {
        self.content.get(&Pointer::parse(pointer)?)
    }

    pub fn get_or_default<'a>(&'a self, pointer: &str, default: &'a Value) -> &'a Value {
        match Pointer::parse(pointer) {
            Ok(pointer) => self.content.get_or_default(&pointer, default),
            Err(_) => default,
        }
    }

    /// Write `value` at `pointer`, resolving its directives first when
    /// references are allowed.
    pub fn update(&mut self, pointer: &str, value: Value) -> Result<&mut Self> {
        let pointer = Pointer::parse(pointer)?;
        let value = match self.resolver.as_mut() {
            Some(resolver) => resolver.resolve(self.content.as_ref(), value, UPDATE_CONTEXT)?,
            None => value,
        };
        self.content.update(&pointer, value)?;
        Ok(self)
    }

    /// Delete every node in `pointers`; missing nodes are ignored.
    pub fn delete<S: AsRef<str>>(&mut self, pointers: &[S]) -> &mut Self {
        for raw in pointers {
            match Pointer::parse(raw.as_ref()) {
                Ok(pointer) => {
                    self.content.delete(&pointer);
                }
                Err(err) => log::debug!("Ignoring delete of malformed pointer: {err}"),
            }
        }
        self
    }

    /// Clear the resolver caches; a no-op without reference resolution.
    pub fn invalidate_cache(&mut self) -> &mut Self {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.invalidate_cache();
        }
        self
    }

    #[must_use]
    pub fn content(&self) -> &Value {
        self.content.content()
    }

    #[must_use]
    pub fn wrapper(&self) -> &dyn ContentWrapper {
        self.content.as_ref()
    }

    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        self.content.iterate()
    }

    #[must_use]
    pub fn references_allowed(&self) -> bool {
        self.resolver.is_some()
    }

    #[must_use]
    pub fn into_content(self) -> Value {
        self.content.into_content()
    }
}

impl fmt::Debug for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDocument")
            .field("wrapper", &self.content.kind())
            .field("references", &self.references_allowed())
            .finish()
    }
}

impl fmt::Display for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content())
    }
}

impl PartialEq for JsonDocument {
    fn eq(&self, other: &Self) -> bool {
        self.content() == other.content()
    }
}

impl PartialEq<Value> for JsonDocument {
    fn eq(&self, other: &Value) -> bool {
        self.content() == other
    }
}

#[derive(Debug, Clone)]
enum Source {
    Data(Value),
    File(PathBuf),
}

/// Step-by-step setup of a [`JsonDocument`].
///
/// Defaults: empty map, no reference resolution, no cache, direct wrapper.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    source: Source,
    allow_references: bool,
    enable_cache: bool,
    wrapper: WrapperKind,
    base_dir: Option<PathBuf>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            source: Source::Data(Value::Object(serde_json::Map::new())),
            allow_references: false,
            enable_cache: false,
            wrapper: WrapperKind::default(),
            base_dir: None,
        }
    }
}

impl DocumentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_data(mut self, content: Value) -> Self {
        self.source = Source::Data(content);
        self
    }

    /// Read the content from a JSON or YAML file on `build`.
    #[must_use]
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Source::File(path.into());
        self
    }

    /// Resolve `!ref`/`!file` strings, optionally memoizing each target.
    #[must_use]
    pub fn set_reference_policy(mut self, allow: bool, cache: bool) -> Self {
        self.allow_references = allow;
        self.enable_cache = cache;
        self
    }

    #[must_use]
    pub fn set_wrapper(mut self, wrapper: WrapperKind) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Directory relative `!file` paths are resolved against.
    #[must_use]
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn build(self) -> Result<JsonDocument> {
        let content = match self.source {
            Source::Data(value) => value,
            Source::File(path) => DataReader::default().read_path(&path, None)?,
        };
        if !(content.is_object() || content.is_array()) {
            return Err(Error::InvalidInput(format!(
                "content must be a map or a sequence, got {content}"
            )));
        }

        let mut wrapper = self.wrapper.wrap(content);
        let resolver = if self.allow_references {
            let mut resolver =
                ReferenceResolver::new(self.enable_cache).with_base_dir(self.base_dir);
            resolver.resolve_all(wrapper.as_mut())?;
            Some(resolver)
        } else {
            None
        };

        Ok(JsonDocument {
            content: wrapper,
            resolver,
        })
    }
}
