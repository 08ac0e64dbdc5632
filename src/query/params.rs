//! Decoding and encoding of projection and rename parameters.

use super::ast::RENAME_ARROW;
use crate::error::{RelalgError, Result};
use crate::relation::{is_identifier, RenameMap};

/// Decodes `a, b, c`; repeated names collapse to their first occurrence.
pub fn parse_projection(param: &str) -> Result<Vec<String>> {
    let mut attributes: Vec<String> = Vec::new();
    for raw in param.split(',') {
        let name = raw.trim();
        if !is_identifier(name) {
            return Err(RelalgError::parse(format!(
                "invalid attribute '{name}' in projection list '{param}'"
            )));
        }
        if !attributes.iter().any(|a| a == name) {
            attributes.push(name.to_owned());
        }
    }
    Ok(attributes)
}

/// Decodes `old➡new, old2➡new2`; each source may appear once.
pub fn parse_rename(param: &str) -> Result<RenameMap> {
    let mut map = RenameMap::new();
    for pair in param.split(',') {
        let Some((old, new)) = pair.split_once(RENAME_ARROW) else {
            return Err(RelalgError::parse(format!(
                "rename entry '{}' needs the form old{RENAME_ARROW}new",
                pair.trim()
            )));
        };
        let (old, new) = (old.trim(), new.trim());
        if !is_identifier(old) || !is_identifier(new) {
            return Err(RelalgError::parse(format!(
                "invalid rename entry '{}'",
                pair.trim()
            )));
        }
        if map.insert(old.to_owned(), new.to_owned()).is_some() {
            return Err(RelalgError::parse(format!(
                "attribute '{old}' renamed more than once"
            )));
        }
    }
    Ok(map)
}

/// Encodes an attribute list.
pub fn format_projection<S: AsRef<str>>(attributes: &[S]) -> String {
    attributes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Encodes a rename map in source order.
pub fn format_rename(map: &RenameMap) -> String {
    map.iter()
        .map(|(old, new)| format!("{old}{RENAME_ARROW}{new}"))
        .collect::<Vec<_>>()
        .join(",")
}
