#![forbid(unsafe_code)]

//! Relation data model and the algebraic operators evaluated by query plans.
//!
//! A [`Relation`] is a [`Header`] plus a set of tuples. The tuple set lives behind an
//! [`Arc`] so that renames share content; the first mutating call on a shared
//! relation materializes a private copy.

mod env;
pub mod header;
pub mod io;
pub mod value;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{RelalgError, Result};
use crate::expr::{Bindings, ExprError, Predicate};

pub use env::Environment;
pub use header::{is_identifier, Header, RenameMap};
pub use io::Format;
pub use value::{Value, ValueType};

/// One row, positionally aligned with the header.
pub type Tuple = Vec<Value>;

/// Cell used to pad unmatched rows in outer joins.
pub const OUTER_JOIN_PADDING: &str = "---";

/// A header and a set of equal-arity tuples.
#[derive(Clone, Debug)]
pub struct Relation {
    header: Header,
    content: Arc<BTreeSet<Tuple>>,
}

impl Relation {
    /// Empty relation with the given header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            content: Arc::new(BTreeSet::new()),
        }
    }

    /// Builds a relation from typed rows; every row must match the header's arity.
    pub fn from_rows<I>(header: Header, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Tuple>,
    {
        let mut content = BTreeSet::new();
        for row in rows {
            check_arity(&header, row.len())?;
            content.insert(row);
        }
        Ok(Self {
            header,
            content: Arc::new(content),
        })
    }

    /// Builds a relation from raw text rows, casting each column as a whole.
    pub fn from_raw<S: AsRef<str>>(header: Header, rows: &[Vec<S>]) -> Result<Self> {
        for row in rows {
            check_arity(&header, row.len())?;
        }
        let types: Vec<ValueType> = (0..header.len())
            .map(|col| ValueType::infer(rows.iter().map(|row| row[col].as_ref())))
            .collect();
        trace!(header = %header, ?types, "casting raw columns");
        let content = rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&types)
                    .map(|(raw, ty)| Value::cast(raw.as_ref(), *ty))
                    .collect()
            })
            .collect();
        Ok(Self {
            header,
            content: Arc::new(content),
        })
    }

    /// The relation's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True when the relation holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Tuples in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.content.iter()
    }

    /// True when `tuple` is a member.
    pub fn contains(&self, tuple: &[Value]) -> bool {
        self.content.contains(tuple)
    }

    /// True while the tuple set is shared with another relation.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.content) > 1
    }

    fn with_content(&self, header: Header, content: BTreeSet<Tuple>) -> Relation {
        Relation {
            header,
            content: Arc::new(content),
        }
    }

    fn content_mut(&mut self) -> &mut BTreeSet<Tuple> {
        if self.is_shared() {
            debug!(header = %self.header, rows = self.len(), "materializing private copy of shared content");
        }
        Arc::make_mut(&mut self.content)
    }

    /// Returns `other`'s tuples reordered to this relation's column order.
    fn align(&self, other: &Relation, op: &str) -> Result<Arc<BTreeSet<Tuple>>> {
        if !self.header.same_set(&other.header) {
            return Err(RelalgError::schema(format!(
                "{op} requires the same attributes: ({}) vs ({})",
                self.header, other.header
            )));
        }
        if self.header == other.header {
            return Ok(Arc::clone(&other.content));
        }
        let positions = other.header.positions(self.header.attributes())?;
        Ok(Arc::new(
            other
                .content
                .iter()
                .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        ))
    }

    /// Same tuples with the columns reordered to match `header`.
    pub fn rearrange(&self, header: &Header) -> Result<Relation> {
        let target = Relation::new(header.clone());
        Ok(Relation {
            header: header.clone(),
            content: target.align(self, "rearrange")?,
        })
    }

    fn matching(&self, predicate: &Predicate) -> Result<BTreeSet<Tuple>> {
        let bindings = Bindings::new(self.header.attributes());
        let mut matched = BTreeSet::new();
        for row in self.content.iter() {
            let keep = predicate
                .test(&bindings, row)
                .map_err(|err| evaluation_error(predicate, row, err))?;
            if keep {
                matched.insert(row.clone());
            }
        }
        Ok(matched)
    }

    /// σ: tuples for which `predicate` is truthy.
    pub fn selection(&self, predicate: &str) -> Result<Relation> {
        self.filter(&parse_predicate(predicate)?)
    }

    /// σ with an already parsed predicate.
    pub fn filter(&self, predicate: &Predicate) -> Result<Relation> {
        let matched = self.matching(predicate)?;
        Ok(self.with_content(self.header.clone(), matched))
    }

    /// Cartesian product; the headers must be disjoint.
    pub fn product(&self, other: &Relation) -> Result<Relation> {
        let shared = self.header.shared(&other.header);
        if !shared.is_empty() {
            return Err(RelalgError::schema(format!(
                "product requires disjoint attributes, both sides have: {}",
                shared.join(", ")
            )));
        }
        let header = Header::new(
            self.header
                .attributes()
                .iter()
                .chain(other.header.attributes())
                .cloned(),
        )?;
        let mut content = BTreeSet::new();
        for left in self.content.iter() {
            for right in other.content.iter() {
                content.insert(left.iter().chain(right).cloned().collect());
            }
        }
        Ok(self.with_content(header, content))
    }

    /// π: keeps the listed attributes, in list order; repeated names collapse.
    pub fn projection<S: AsRef<str>>(&self, attributes: &[S]) -> Result<Relation> {
        let mut names: Vec<&str> = Vec::with_capacity(attributes.len());
        for name in attributes {
            if !names.contains(&name.as_ref()) {
                names.push(name.as_ref());
            }
        }
        if names.is_empty() {
            return Err(RelalgError::schema("projection needs at least one attribute"));
        }
        let positions = self.header.positions(&names)?;
        let header = Header::new(names.iter().copied())?;
        let content = self
            .content
            .iter()
            .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(self.with_content(header, content))
    }

    /// ρ: relabels attributes simultaneously; the tuple set is shared, not copied.
    pub fn rename(&self, map: &RenameMap) -> Result<Relation> {
        Ok(Relation {
            header: self.header.rename(map)?,
            content: Arc::clone(&self.content),
        })
    }

    /// ∪ over relations with the same attribute set.
    pub fn union(&self, other: &Relation) -> Result<Relation> {
        let other = self.align(other, "union")?;
        let content = self.content.union(&other).cloned().collect();
        Ok(self.with_content(self.header.clone(), content))
    }

    /// ∩ over relations with the same attribute set.
    pub fn intersection(&self, other: &Relation) -> Result<Relation> {
        let other = self.align(other, "intersection")?;
        let content = self.content.intersection(&other).cloned().collect();
        Ok(self.with_content(self.header.clone(), content))
    }

    /// − over relations with the same attribute set.
    pub fn difference(&self, other: &Relation) -> Result<Relation> {
        let other = self.align(other, "difference")?;
        let content = self.content.difference(&other).cloned().collect();
        Ok(self.with_content(self.header.clone(), content))
    }

    /// ÷: tuples over the dividend-only attributes that combine with every divisor tuple.
    pub fn division(&self, other: &Relation) -> Result<Relation> {
        if let Some(missing) = other
            .header
            .attributes()
            .iter()
            .find(|a| !self.header.contains(a))
        {
            return Err(RelalgError::schema(format!(
                "division: divisor attribute '{missing}' not in dividend ({})",
                self.header
            )));
        }
        let unique: Vec<String> = self
            .header
            .attributes()
            .iter()
            .filter(|a| !other.header.contains(a))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Err(RelalgError::schema(
                "division: dividend has no attributes outside the divisor",
            ));
        }
        let candidates = self.projection(&unique)?;
        let combined = candidates.product(other)?;
        let missing = combined.difference(self)?;
        let disqualified = missing.projection(&unique)?;
        candidates.difference(&disqualified)
    }

    /// ⋈: natural join on the shared attributes (a product when none are shared).
    pub fn join(&self, other: &Relation) -> Result<Relation> {
        self.join_impl(other, false)
    }

    /// ⧑: natural join keeping unmatched left rows, padded with [`OUTER_JOIN_PADDING`].
    pub fn outer_left(&self, other: &Relation) -> Result<Relation> {
        self.join_impl(other, true)
    }

    /// ⧒: natural join keeping unmatched right rows; columns follow the left-join order.
    pub fn outer_right(&self, other: &Relation) -> Result<Relation> {
        let mirrored = other.outer_left(self)?;
        let header = self.join_header(other)?;
        mirrored.rearrange(&header)
    }

    /// ⧓: union of the left and right outer joins.
    pub fn outer(&self, other: &Relation) -> Result<Relation> {
        self.outer_left(other)?.union(&self.outer_right(other)?)
    }

    /// Selection over the product of both relations.
    pub fn thetajoin(&self, other: &Relation, predicate: &str) -> Result<Relation> {
        self.product(other)?.selection(predicate)
    }

    fn join_header(&self, other: &Relation) -> Result<Header> {
        Header::new(
            self.header.attributes().iter().cloned().chain(
                other
                    .header
                    .attributes()
                    .iter()
                    .filter(|a| !self.header.contains(a))
                    .cloned(),
            ),
        )
    }

    fn join_impl(&self, other: &Relation, keep_unmatched: bool) -> Result<Relation> {
        let shared = self.header.shared(&other.header);
        let left_keys = self.header.positions(&shared)?;
        let right_keys = other.header.positions(&shared)?;
        let right_rest: Vec<usize> = (0..other.header.len())
            .filter(|i| !right_keys.contains(i))
            .collect();
        let header = self.join_header(other)?;
        trace!(shared = ?shared, "nested-loop join");

        let mut content = BTreeSet::new();
        for left in self.content.iter() {
            let mut matched = false;
            for right in other.content.iter() {
                let equal = left_keys
                    .iter()
                    .zip(&right_keys)
                    .all(|(&l, &r)| left[l] == right[r]);
                if equal {
                    matched = true;
                    content.insert(
                        left.iter()
                            .cloned()
                            .chain(right_rest.iter().map(|&i| right[i].clone()))
                            .collect(),
                    );
                }
            }
            if keep_unmatched && !matched {
                content.insert(
                    left.iter()
                        .cloned()
                        .chain(right_rest.iter().map(|_| Value::from(OUTER_JOIN_PADDING)))
                        .collect(),
                );
            }
        }
        Ok(self.with_content(header, content))
    }

    /// Adds a tuple; returns 1 when it was new and 0 for a duplicate.
    ///
    /// Values are cast to their column's type first, so `"1"` lands in an int
    /// column as `1`; a value the column cannot hold is a schema error.
    pub fn insert(&mut self, tuple: Tuple) -> Result<usize> {
        check_arity(&self.header, tuple.len())?;
        let types = self.column_types();
        let tuple = tuple
            .into_iter()
            .enumerate()
            .map(|(idx, value)| self.conform(idx, types[idx], value))
            .collect::<Result<Tuple>>()?;
        Ok(usize::from(self.content_mut().insert(tuple)))
    }

    /// The single type each column holds, or `None` for empty columns and columns
    /// mixing types (outer-join padding).
    fn column_types(&self) -> Vec<Option<ValueType>> {
        let mut types = vec![None; self.header.len()];
        let mut mixed = vec![false; self.header.len()];
        for row in self.content.iter() {
            for (idx, value) in row.iter().enumerate() {
                match types[idx] {
                    None if !mixed[idx] => types[idx] = Some(value.value_type()),
                    Some(ty) if ty != value.value_type() => {
                        types[idx] = None;
                        mixed[idx] = true;
                    }
                    _ => {}
                }
            }
        }
        types
    }

    fn conform(&self, idx: usize, ty: Option<ValueType>, value: Value) -> Result<Value> {
        let Some(ty) = ty else {
            return Ok(value);
        };
        if value.value_type() == ty {
            return Ok(value);
        }
        let cast = Value::cast(&value.to_string(), ty);
        if cast.value_type() != ty {
            return Err(RelalgError::schema(format!(
                "cannot store {} in {ty} column '{}'",
                value.quoted(),
                self.header.attributes()[idx]
            )));
        }
        Ok(cast)
    }

    /// Removes the tuples matching `predicate`; returns how many were removed.
    pub fn delete(&mut self, predicate: &str) -> Result<usize> {
        let predicate = parse_predicate(predicate)?;
        let matched = self.matching(&predicate)?;
        if matched.is_empty() {
            return Ok(0);
        }
        self.content_mut().retain(|row| !matched.contains(row));
        Ok(matched.len())
    }

    /// Overwrites `changes` on every tuple matching `predicate`; returns the number of
    /// matched tuples. Nothing is modified when validation or evaluation fails.
    pub fn update(&mut self, predicate: &str, changes: &BTreeMap<String, Value>) -> Result<usize> {
        let types = self.column_types();
        let targets: Vec<(usize, Value)> = changes
            .iter()
            .map(|(name, value)| {
                let idx = self.header.position(name).ok_or_else(|| {
                    RelalgError::schema(format!(
                        "cannot update '{name}': attribute not in header ({})",
                        self.header
                    ))
                })?;
                Ok((idx, self.conform(idx, types[idx], value.clone())?))
            })
            .collect::<Result<_>>()?;
        let predicate = parse_predicate(predicate)?;
        let matched = self.matching(&predicate)?;
        if matched.is_empty() {
            return Ok(0);
        }
        let updated: Vec<Tuple> = matched
            .iter()
            .map(|row| {
                let mut row = row.clone();
                for (idx, value) in &targets {
                    row[*idx] = value.clone();
                }
                row
            })
            .collect();
        let content = self.content_mut();
        content.retain(|row| !matched.contains(row));
        content.extend(updated);
        Ok(matched.len())
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        match self.align(other, "comparison") {
            Ok(aligned) => *aligned == *self.content,
            Err(_) => false,
        }
    }
}

impl Eq for Relation {}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Vec<String>> = self
            .content
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let mut widths: Vec<usize> = self
            .header
            .attributes()
            .iter()
            .map(|a| a.chars().count())
            .collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_owned()
        };
        writeln!(f, "{}", line(self.header.attributes()))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rows {
            writeln!(f, "{}", line(row))?;
        }
        Ok(())
    }
}

fn check_arity(header: &Header, arity: usize) -> Result<()> {
    if arity != header.len() {
        return Err(RelalgError::schema(format!(
            "tuple has {arity} values but header ({header}) has {}",
            header.len()
        )));
    }
    Ok(())
}

pub(crate) fn parse_predicate(text: &str) -> Result<Predicate> {
    Predicate::parse(text)
        .map_err(|err| RelalgError::parse(format!("invalid predicate `{}`: {err}", text.trim())))
}

fn evaluation_error(predicate: &Predicate, row: &[Value], err: ExprError) -> RelalgError {
    let tuple = row.iter().map(Value::quoted).collect::<Vec<_>>().join(", ");
    RelalgError::Evaluation {
        predicate: predicate.source().to_owned(),
        tuple: format!("({tuple})"),
        message: err.to_string(),
    }
}
