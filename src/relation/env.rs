use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::{is_identifier, Format, Relation};
use crate::error::{RelalgError, Result};

/// Named relations a query is evaluated and optimized against.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    relations: BTreeMap<String, Relation>,
}

impl Environment {
    /// Empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, returning the relation it replaced.
    pub fn insert(&mut self, name: impl Into<String>, relation: Relation) -> Result<Option<Relation>> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(RelalgError::parse(format!(
                "'{name}' is not a valid relation name"
            )));
        }
        Ok(self.relations.insert(name, relation))
    }

    /// Looks up a relation; an unbound name is a [`RelalgError::Name`].
    pub fn get(&self, name: &str) -> Result<&Relation> {
        self.relations
            .get(name)
            .ok_or_else(|| RelalgError::Name(name.to_owned()))
    }

    /// Mutable access for insert/update/delete.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Relation> {
        self.relations
            .get_mut(name)
            .ok_or_else(|| RelalgError::Name(name.to_owned()))
    }

    /// True when `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Unbinds `name`.
    pub fn remove(&mut self, name: &str) -> Option<Relation> {
        self.relations.remove(name)
    }

    /// Bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Number of bound relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Loads a relation file and binds it to `name`.
    pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let relation = Relation::load(path)?;
        self.insert(name, relation)?;
        Ok(())
    }

    /// Binds every `.csv`/`.json` file of `dir` under its file stem. Files whose
    /// stem is not a valid name are skipped. Returns the names bound, sorted.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let mut entries: Vec<_> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();
        let mut loaded = Vec::new();
        for path in entries {
            if !path.is_file() || Format::from_path(&path).is_err() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_identifier(stem) {
                debug!(path = %path.display(), "skipping file with invalid relation name");
                continue;
            }
            self.load(stem, &path)?;
            loaded.push(stem.to_owned());
        }
        debug!(dir = %dir.display(), count = loaded.len(), "loaded relation directory");
        Ok(loaded)
    }
}
