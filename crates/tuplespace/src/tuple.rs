// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of LindaSpaces.
//
// LindaSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// LindaSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with LindaSpaces. If not, see <https://www.gnu.org/licenses/>.

//! Tuple and pattern model
//!
//! ## Purpose
//! A [`Tuple`] is an immutable, fixed-arity sequence of string fields. A
//! [`Pattern`] has the same shape but any field may be a wildcard. Matching is
//! purely structural: equal arity, and every concrete pattern field equal to the
//! tuple field at the same position.
//!
//! ## Equality
//! Patterns compare and hash by value (the field sequence), never by identity.
//! Two callers blocking on structurally identical patterns therefore land on
//! the same wait-handle in the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TupleSpaceError;

/// A tuple in the space
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple {
    /// Tuple fields
    fields: Vec<String>,
}

impl Tuple {
    /// Create a new tuple from fields
    pub fn new(fields: Vec<String>) -> Self {
        Tuple { fields }
    }

    /// Build a tuple from fields that may be missing.
    ///
    /// ## Errors
    /// `TupleSpaceError::MalformedTuple` naming the first missing position.
    pub fn try_from_fields(fields: Vec<Option<String>>) -> Result<Self, TupleSpaceError> {
        let mut checked = Vec::with_capacity(fields.len());
        for (position, field) in fields.into_iter().enumerate() {
            match field {
                Some(value) => checked.push(value),
                None => return Err(TupleSpaceError::MalformedTuple { position }),
            }
        }
        Ok(Tuple { fields: checked })
    }

    /// Get the fields of the tuple
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `position`, if within arity
    pub fn field(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }

    /// Number of fields
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Consume the tuple, returning its fields
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    /// Check if tuple matches a pattern
    pub fn matches(&self, pattern: &Pattern) -> bool {
        pattern.matches(self)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.fields.join(", "))
    }
}

impl From<Vec<String>> for Tuple {
    fn from(fields: Vec<String>) -> Self {
        Tuple::new(fields)
    }
}

impl From<Vec<&str>> for Tuple {
    fn from(fields: Vec<&str>) -> Self {
        Tuple::new(fields.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Tuple {
    fn from(fields: [&str; N]) -> Self {
        Tuple::new(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// Field in a pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternField {
    /// Exact match
    Exact(String),
    /// Wildcard (matches any value)
    Wildcard,
}

impl PatternField {
    /// Check if a field matches this pattern field
    pub fn matches(&self, field: &str) -> bool {
        match self {
            PatternField::Exact(expected) => expected == field,
            PatternField::Wildcard => true,
        }
    }

    /// Concrete value, or `None` for a wildcard
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            PatternField::Exact(value) => Some(value),
            PatternField::Wildcard => None,
        }
    }

    /// Whether this field is a wildcard
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PatternField::Wildcard)
    }
}

impl fmt::Display for PatternField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternField::Exact(value) => f.write_str(value),
            PatternField::Wildcard => f.write_str("_"),
        }
    }
}

impl From<&str> for PatternField {
    fn from(val: &str) -> Self {
        PatternField::Exact(val.to_string())
    }
}

impl From<String> for PatternField {
    fn from(val: String) -> Self {
        PatternField::Exact(val)
    }
}

impl From<&String> for PatternField {
    fn from(val: &String) -> Self {
        PatternField::Exact(val.clone())
    }
}

// `None` is a wildcard, the convention callers use for "any value here".
impl<S: Into<String>> From<Option<S>> for PatternField {
    fn from(val: Option<S>) -> Self {
        match val {
            Some(value) => PatternField::Exact(value.into()),
            None => PatternField::Wildcard,
        }
    }
}

/// Pattern for matching tuples
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern fields
    fields: Vec<PatternField>,
}

impl Pattern {
    /// Create a new pattern
    pub fn new(fields: Vec<PatternField>) -> Self {
        Pattern { fields }
    }

    /// Pattern of `arity` wildcards (matches every tuple of that arity)
    pub fn wildcard(arity: usize) -> Self {
        Pattern {
            fields: vec![PatternField::Wildcard; arity],
        }
    }

    /// Get the fields of the pattern
    pub fn fields(&self) -> &[PatternField] {
        &self.fields
    }

    /// Number of fields
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Concrete fields as `(position, value)` pairs
    pub fn concrete_fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(position, field)| field.as_exact().map(|value| (position, value)))
    }

    /// True when no field is concrete
    pub fn is_all_wildcards(&self) -> bool {
        self.fields.iter().all(PatternField::is_wildcard)
    }

    /// Check if a tuple matches this pattern
    pub fn matches(&self, tuple: &Tuple) -> bool {
        if self.fields.len() != tuple.fields.len() {
            return false;
        }

        self.fields
            .iter()
            .zip(tuple.fields.iter())
            .all(|(pattern_field, field)| pattern_field.matches(field))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str(")")
    }
}

impl From<&Tuple> for Pattern {
    fn from(tuple: &Tuple) -> Self {
        Pattern::new(
            tuple
                .fields
                .iter()
                .map(|field| PatternField::Exact(field.clone()))
                .collect(),
        )
    }
}

impl From<Vec<PatternField>> for Pattern {
    fn from(fields: Vec<PatternField>) -> Self {
        Pattern::new(fields)
    }
}

/// Helper macro for creating tuples from values
///
/// # Examples
/// ```
/// # use lindaspaces_tuplespace::tuple;
/// let t = tuple!("room1", "msg", "0", "hi");
/// assert_eq!(t.arity(), 4);
/// ```
#[macro_export]
macro_rules! tuple {
    ($($field:expr),* $(,)?) => {
        $crate::Tuple::new(vec![$(::std::string::String::from($field)),*])
    };
}

/// Helper macro for creating patterns; `_` is a wildcard
///
/// Fields must be single tokens (literals or identifiers); wrap longer
/// expressions in parentheses.
///
/// # Examples
/// ```
/// # use lindaspaces_tuplespace::{pattern, tuple};
/// let p = pattern!("room1", "msg", "0", _);
/// assert!(p.matches(&tuple!("room1", "msg", "0", "hi")));
/// ```
#[macro_export]
macro_rules! pattern {
    (@field _) => {
        $crate::PatternField::Wildcard
    };
    (@field $field:expr) => {
        $crate::PatternField::from($field)
    };
    ($($field:tt),* $(,)?) => {
        $crate::Pattern::new(vec![$($crate::pattern!(@field $field)),*])
    };
}
