//! `!file` and `!include` handlers.

use super::handler::{
    CompositionContext, CompositionHandler, CompositionStatus, directive_option, string_payload,
};
use crate::io::{DataFormat, DataReader};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

pub const FILE_MARKER: &str = "!file";
pub const INCLUDE_MARKER: &str = "!include";

/// Parsed file content keyed by normalized path. Always hands out copies so
/// later edits of the composed document never leak back into the cache.
#[derive(Debug, Default)]
struct FileCache {
    enabled: bool,
    entries: HashMap<String, Value>,
}

impl FileCache {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: HashMap::new(),
        }
    }

    fn load(&mut self, key: String, read: impl FnOnce() -> Result<Value>) -> Result<Value> {
        if !self.enabled {
            return read();
        }
        if let Some(cached) = self.entries.get(&key) {
            log::trace!("File cache hit for {key}");
            return Ok(cached.clone());
        }
        let value = read()?;
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// `{"!file": "path/to/file.json"}`: parsed JSON content of a file.
#[derive(Debug)]
pub struct FileReferenceHandler {
    reader: DataReader,
    cache: FileCache,
}

impl FileReferenceHandler {
    #[must_use]
    pub fn new(use_cache: bool, base_dir: Option<PathBuf>) -> Self {
        Self {
            reader: DataReader::new(base_dir),
            cache: FileCache::new(use_cache),
        }
    }
}

impl CompositionHandler for FileReferenceHandler {
    fn name(&self) -> &'static str {
        "FileReference"
    }

    fn marker(&self) -> &'static str {
        FILE_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        _ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let raw = string_payload(directive, FILE_MARKER)?;
        let reader = &self.reader;
        let value = self
            .cache
            .load(reader.cache_key(raw), || reader.read(raw, Some(DataFormat::Json)))?;
        Ok((CompositionStatus::Success, value))
    }

    fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}

/// `{"!include": "path", "$format": "yaml", "$compose": true}`: file content
/// in an explicit or inferred format.
///
/// Included content is never rescanned by the including document. With
/// `$compose` set it is first composed on its own.
#[derive(Debug)]
pub struct IncludeFileHandler {
    reader: DataReader,
    cache: FileCache,
}

impl IncludeFileHandler {
    #[must_use]
    pub fn new(use_cache: bool, base_dir: Option<PathBuf>) -> Self {
        Self {
            reader: DataReader::new(base_dir),
            cache: FileCache::new(use_cache),
        }
    }
}

impl CompositionHandler for IncludeFileHandler {
    fn name(&self) -> &'static str {
        "IncludeFile"
    }

    fn marker(&self) -> &'static str {
        INCLUDE_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        _ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let raw = string_payload(directive, INCLUDE_MARKER)?;

        let compose = match directive_option(directive, "compose") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "\"$compose\" expects a boolean, got {other}"
                )));
            }
        };

        let path = self.reader.resolve_path(raw);
        let format = match directive_option(directive, "format") {
            None => DataFormat::from_path(&path),
            Some(Value::String(label)) => label.parse()?,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "\"$format\" expects a format name, got {other}"
                )));
            }
        };

        let reader = &self.reader;
        let key = format!("{format}:{}", path.display());
        let value = self
            .cache
            .load(key, || reader.read_path(&path, Some(format)))?;

        let status = if compose {
            CompositionStatus::ComposeInSeparateContext
        } else {
            CompositionStatus::Completed
        };
        Ok((status, value))
    }

    fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}
