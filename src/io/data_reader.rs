//! Read fixture files referenced by directives
//!
//! Files are parsed according to an explicit [`DataFormat`] or one inferred
//! from the extension. Relative paths are resolved against an optional base
//! directory and lexically normalized, so the same file reached through
//! `./a/../b.json` and `b.json` shares one cache key.

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl DataFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Yaml => "yaml",
            DataFormat::Text => "txt",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            "txt" | "text" => Some(DataFormat::Text),
            _ => None,
        }
    }

    /// Infer the format from the file extension; unknown extensions read as text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            log::warn!(
                "No extension on {}, reading content as text",
                path.display()
            );
            return DataFormat::Text;
        };

        DataFormat::from_label(ext).unwrap_or_else(|| {
            log::warn!(
                "Unknown extension '{ext}' on {}, reading content as text",
                path.display()
            );
            DataFormat::Text
        })
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataFormat::from_label(s).ok_or_else(|| {
            Error::InvalidInput(format!("unknown data format '{s}' (use json, yaml or txt)"))
        })
    }
}

/// Loads and parses directive target files.
#[derive(Debug, Clone, Default)]
pub struct DataReader {
    base_dir: Option<PathBuf>,
}

impl DataReader {
    #[must_use]
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve a raw directive path against the base directory.
    #[must_use]
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        let joined = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        normalize_path(&joined)
    }

    /// Canonical cache key for a raw directive path.
    #[must_use]
    pub fn cache_key(&self, raw: &str) -> String {
        self.resolve_path(raw).to_string_lossy().into_owned()
    }

    /// Read a raw directive path.
    pub fn read(&self, raw: &str, format: Option<DataFormat>) -> Result<Value> {
        let path = self.resolve_path(raw);
        self.read_path(&path, format)
    }

    /// Read an already resolved path.
    pub fn read_path(&self, path: &Path, format: Option<DataFormat>) -> Result<Value> {
        let format = format.unwrap_or_else(|| DataFormat::from_path(path));
        log::debug!("Reading {} as {format}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        parse_content(&text, format, &path.display().to_string())
    }
}

/// Parse file content according to the format.
pub fn parse_content(text: &str, format: DataFormat, origin: &str) -> Result<Value> {
    match format {
        DataFormat::Json => {
            if text.trim().is_empty() {
                return Err(Error::Parse {
                    path: origin.to_string(),
                    message: "no content to parse".to_string(),
                });
            }
            serde_json::from_str(text).map_err(|err| Error::Parse {
                path: origin.to_string(),
                message: describe_json_error(text, &err),
            })
        }
        DataFormat::Yaml => serde_yaml::from_str(text).map_err(|err| Error::Parse {
            path: origin.to_string(),
            message: err.to_string(),
        }),
        DataFormat::Text => Ok(Value::String(text.to_string())),
    }
}

fn describe_json_error(text: &str, err: &serde_json::Error) -> String {
    let line = text.lines().nth(err.line().saturating_sub(1)).unwrap_or("");
    let marker = " ".repeat(err.column().saturating_sub(1));
    format!("{err}\n{line}\n{marker}^")
}

/// Collapse `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
