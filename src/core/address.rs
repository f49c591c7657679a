//! Target addresses - WHERE a target is declared.
//!
//! An address is a directory relative to the build root (the "spec path")
//! plus a target name. The textual form is `spec_path:name`; the short form
//! `spec_path` names the target after the last path component, and `:name`
//! is resolved relative to the directory of the declaring build file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error parsing an address spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty address spec")]
    Empty,

    #[error("invalid address `{spec}`: {reason}")]
    Invalid { spec: String, reason: String },
}

/// The unique location of a target in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    spec_path: String,
    name: String,
}

impl Address {
    /// Create an address from an already-normalized spec path and a name.
    pub fn new(spec_path: impl Into<String>, name: impl Into<String>) -> Self {
        Address {
            spec_path: spec_path.into().trim_matches('/').to_string(),
            name: name.into(),
        }
    }

    /// Parse an absolute address spec (`path/to:name`, `path/to`, `//path:name`).
    pub fn parse(spec: &str) -> Result<Self, AddressError> {
        Self::parse_relative(spec, "")
    }

    /// Parse an address spec, resolving `:name` against `relative_to`.
    pub fn parse_relative(spec: &str, relative_to: &str) -> Result<Self, AddressError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let invalid = |reason: &str| AddressError::Invalid {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (body, relative_to) = match trimmed.strip_prefix("//") {
            Some(body) => (body, ""),
            None => (trimmed, relative_to),
        };

        let (path, name) = match body.rsplit_once(':') {
            Some((path, name)) => {
                if name.is_empty() {
                    return Err(invalid("target name is empty"));
                }
                let path = if path.is_empty() { relative_to } else { path };
                (path, Some(name))
            }
            None => (body, None),
        };

        let spec_path =
            normalize_spec_path(path).ok_or_else(|| invalid("path escapes the build root"))?;

        let name = match name {
            Some(name) => name.to_string(),
            None => match spec_path.rsplit('/').next() {
                Some(last) if !last.is_empty() => last.to_string(),
                _ => return Err(invalid("cannot infer a target name for the build root")),
            },
        };

        if name.contains('/') {
            return Err(invalid("target name may not contain '/'"));
        }

        Ok(Address { spec_path, name })
    }

    /// The directory of the declaring build file, relative to the build root.
    pub fn spec_path(&self) -> &str {
        &self.spec_path
    }

    /// The target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical `spec_path:name` form.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.spec_path, self.name)
    }

    /// A filesystem-safe identifier, e.g. `src.python.foo.foo`.
    pub fn id(&self) -> String {
        if self.spec_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.spec_path.replace('/', "."), self.name)
        }
    }

    /// The spec path followed by each parent directory, ending at the root (`""`).
    pub fn ancestor_spec_paths(&self) -> impl Iterator<Item = &str> {
        std::iter::successors(Some(self.spec_path.as_str()), |path| {
            if path.is_empty() {
                None
            } else {
                Some(path.rfind('/').map_or("", |idx| &path[..idx]))
            }
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.spec_path, self.name)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.reference())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Normalize a slash-separated relative path, folding `.` and `..`.
///
/// Returns `None` when the path climbs above the build root.
pub fn normalize_spec_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
