//! Ordered, duplicate-free attribute lists and rename maps.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{RelalgError, Result};
use crate::expr::Keyword;

/// Rename mapping from old attribute name to new attribute name.
pub type RenameMap = BTreeMap<String, String>;

/// Returns true when `name` can be used as an attribute or relation name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !Keyword::RESERVED.contains(&name)
}

/// Ordered list of unique attribute names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    attributes: Vec<String>,
}

impl Header {
    /// Builds a header, rejecting invalid and duplicate names.
    pub fn new<I, S>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        let mut seen = BTreeSet::new();
        for name in &attributes {
            if !is_identifier(name) {
                return Err(RelalgError::schema(format!(
                    "'{name}' is not a valid attribute name"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(RelalgError::schema(format!(
                    "attribute '{name}' appears more than once"
                )));
            }
        }
        Ok(Self { attributes })
    }

    /// Attribute names in order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True for the zero-attribute header.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Position of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == name)
    }

    /// True when `name` is an attribute.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Positions of every name in `names`; a missing one is a schema error.
    pub fn positions<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.position(name).ok_or_else(|| {
                    RelalgError::schema(format!("attribute '{name}' not in header ({self})"))
                })
            })
            .collect()
    }

    /// Attributes present in both headers, in this header's order.
    pub fn shared(&self, other: &Header) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| other.contains(a))
            .cloned()
            .collect()
    }

    /// True when both headers hold the same attributes, in any order.
    pub fn same_set(&self, other: &Header) -> bool {
        self.len() == other.len() && self.attributes.iter().all(|a| other.contains(a))
    }

    /// Applies a simultaneous rename; every source must exist.
    pub fn rename(&self, map: &RenameMap) -> Result<Header> {
        for old in map.keys() {
            if !self.contains(old) {
                return Err(RelalgError::schema(format!(
                    "cannot rename '{old}': attribute not in header ({self})"
                )));
            }
        }
        Header::new(
            self.attributes
                .iter()
                .map(|a| map.get(a).unwrap_or(a).clone()),
        )
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.attributes.join(", "))
    }
}
