//! Pointer grammar: RFC 6901 paths plus the `!ref` / `!file` directive forms.
//!
//! Three kinds of address share one type:
//!
//! - `Plain` pointers (`""` for the whole document, `/a/b/0` otherwise),
//! - `Reference` pointers (`!ref /a/b`), which address a node like a plain
//!   pointer but may never address the whole document,
//! - `File` pointers (`!file fixtures/user.json`), whose path is a literal
//!   file path and is never escape-decoded.
//!
//! A reference and a plain pointer with the same path compare (and hash)
//! equal, so either can be used as a node-map key.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub const POINTER_SEP: char = '/';
pub const APPEND_CHAR: &str = "-";
pub const REF_PREFIX: &str = "!ref ";
pub const FILE_PREFIX: &str = "!file ";

const SYNTAX_HINT: &str = "pointer must be \"\" (whole document) or start with \"/\" (e.g. \"/a/b/c\")";

/// Kind of address a [`Pointer`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Plain,
    Reference,
    File,
}

/// Immutable, parsed document address.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pointer {
    kind: PointerKind,
    /// Unescaped segments; `None` addresses the whole document. For `File`
    /// pointers this holds exactly one element: the raw file path.
    path: Option<Vec<String>>,
}

impl Pointer {
    /// Pointer to the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self {
            kind: PointerKind::Plain,
            path: None,
        }
    }

    /// Parse any of the three pointer forms.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(tail) = raw.strip_prefix(REF_PREFIX) {
            let plain = Self::parse_plain(tail).map_err(|_| Error::Syntax {
                input: raw.to_string(),
                reason: format!("reference target is not a valid pointer; {SYNTAX_HINT}"),
            })?;
            if plain.is_root() {
                return Err(Error::Syntax {
                    input: raw.to_string(),
                    reason: "referencing the whole document is not allowed".to_string(),
                });
            }
            return Ok(Self {
                kind: PointerKind::Reference,
                path: plain.path,
            });
        }

        if let Some(tail) = raw.strip_prefix(FILE_PREFIX) {
            if tail.is_empty() {
                return Err(Error::Syntax {
                    input: raw.to_string(),
                    reason: "file reference requires a non-empty path".to_string(),
                });
            }
            return Ok(Self {
                kind: PointerKind::File,
                path: Some(vec![tail.to_string()]),
            });
        }

        Self::parse_plain(raw)
    }

    /// Parse a plain RFC 6901 pointer, rejecting the directive forms.
    pub fn parse_plain(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::root());
        }

        let Some(body) = raw.strip_prefix(POINTER_SEP) else {
            return Err(Error::Syntax {
                input: raw.to_string(),
                reason: SYNTAX_HINT.to_string(),
            });
        };

        Ok(Self {
            kind: PointerKind::Plain,
            path: Some(body.split(POINTER_SEP).map(unescape).collect()),
        })
    }

    /// Build a plain pointer from already unescaped segments.
    /// An empty iterator yields the root pointer.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = segments.into_iter().map(Into::into).collect();
        Self {
            kind: PointerKind::Plain,
            path: if path.is_empty() { None } else { Some(path) },
        }
    }

    /// Quick syntactic test for the string-directive forms.
    #[must_use]
    pub fn is_reference_syntax(raw: &str) -> bool {
        raw.starts_with(REF_PREFIX)
    }

    #[must_use]
    pub fn is_file_syntax(raw: &str) -> bool {
        raw.starts_with(FILE_PREFIX)
    }

    #[must_use]
    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    /// Unescaped segments, `None` for the root.
    #[must_use]
    pub fn path(&self) -> Option<&[String]> {
        match self.kind {
            PointerKind::File => None,
            _ => self.path.as_deref(),
        }
    }

    /// Segments as a slice; the root yields an empty slice.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        self.path().unwrap_or(&[])
    }

    /// Literal path of a `File` pointer.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        match (self.kind, &self.path) {
            (PointerKind::File, Some(path)) => path.first().map(String::as_str),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.kind != PointerKind::File && self.path.is_none()
    }

    /// Final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.path().and_then(|p| p.last()).map(String::as_str)
    }

    /// Plain pointer addressing the same node.
    #[must_use]
    pub fn as_plain(&self) -> Self {
        match self.kind {
            PointerKind::Reference => Self {
                kind: PointerKind::Plain,
                path: self.path.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Drop the last segment; the root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        match self.path() {
            None | Some([_]) => Self::root(),
            Some(path) => Self {
                kind: PointerKind::Plain,
                path: Some(path[..path.len() - 1].to_vec()),
            },
        }
    }

    /// Append one unescaped segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.segments().to_vec();
        path.push(segment.into());
        Self {
            kind: PointerKind::Plain,
            path: Some(path),
        }
    }

    /// Append every segment of `sub` (a pointer rooted at this node).
    #[must_use]
    pub fn join(&self, sub: &Pointer) -> Self {
        let mut path = self.segments().to_vec();
        path.extend(sub.segments().iter().cloned());
        Self::from_segments(path)
    }

    /// True iff `other` is a proper prefix of this pointer.
    #[must_use]
    pub fn is_child_of(&self, other: &Pointer) -> bool {
        if self.kind == PointerKind::File || other.kind == PointerKind::File {
            return false;
        }
        let (mine, theirs) = (self.segments(), other.segments());
        mine.len() > theirs.len() && mine.starts_with(theirs)
    }

    #[must_use]
    pub fn is_parent_of(&self, other: &Pointer) -> bool {
        other.is_child_of(self)
    }

    /// Canonical RFC 6901 body, without any directive prefix.
    fn rfc_pointer(&self) -> String {
        self.segments()
            .iter()
            .fold(String::new(), |mut out, segment| {
                out.push(POINTER_SEP);
                out.push_str(&escape(segment));
                out
            })
    }
}

/// Decode `~1` to `/` and `~0` to `~`. Unknown escapes pass through.
#[must_use]
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encode `~` as `~0` and `/` as `~1`.
#[must_use]
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        let self_file = self.kind == PointerKind::File;
        let other_file = other.kind == PointerKind::File;
        self_file == other_file && self.path == other.path
    }
}

impl Eq for Pointer {}

impl Hash for Pointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.kind == PointerKind::File).hash(state);
        self.path.hash(state);
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PointerKind::Plain => f.write_str(&self.rfc_pointer()),
            PointerKind::Reference => write!(f, "{REF_PREFIX}{}", self.rfc_pointer()),
            PointerKind::File => write!(f, "{FILE_PREFIX}{}", self.file_path().unwrap_or_default()),
        }
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:?})", self.to_string())
    }
}

impl FromStr for Pointer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pointer {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Pointer> for String {
    fn from(pointer: Pointer) -> Self {
        pointer.to_string()
    }
}
