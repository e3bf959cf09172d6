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

//! Indexed in-memory tuple store
//!
//! ## Design
//! - **Partitions**: one per arity, created lazily on first insert
//! - **Primary**: `HashMap<TupleId, Tuple>` per partition (a multiset: equal
//!   tuples get distinct ids)
//! - **Indexes**: per field position, `value -> HashSet<TupleId>`
//! - **Locking**: a single `parking_lot::Mutex` guards all partitions, so a
//!   search-and-remove is one critical section with every index update
//!
//! ## Search
//! For each concrete pattern field the candidate set at that position is
//! fetched; a missing or empty set fails fast. The smallest set is scanned and
//! each id is tested for membership in the others. An all-wildcard pattern
//! takes any member of the partition.
//!
//! ## Performance Characteristics
//! - **Insert**: O(arity)
//! - **Find**: O(smallest candidate set), not O(total tuples)
//! - **Remove**: O(arity) once found

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::{Pattern, Tuple, TupleSpaceError};

/// Identifier of one stored tuple instance
pub type TupleId = u64;

/// Whether a successful search removes the tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Leave the tuple in the store (peek)
    Keep,
    /// Remove the tuple atomically with the search (consume)
    Remove,
}

/// All tuples of one arity plus their per-position indexes
#[derive(Debug)]
struct ArityPartition {
    tuples: HashMap<TupleId, Tuple>,
    index: Vec<HashMap<String, HashSet<TupleId>>>,
}

impl ArityPartition {
    fn new(arity: usize) -> Self {
        ArityPartition {
            tuples: HashMap::new(),
            index: (0..arity).map(|_| HashMap::new()).collect(),
        }
    }

    fn insert(&mut self, id: TupleId, tuple: Tuple) {
        for (position, value) in tuple.fields().iter().enumerate() {
            self.index[position]
                .entry(value.clone())
                .or_default()
                .insert(id);
        }
        self.tuples.insert(id, tuple);
    }

    /// Candidate sets for the concrete fields of `pattern`, or `None` when
    /// some field value has no tuples at all.
    fn candidate_sets(&self, pattern: &Pattern) -> Option<Vec<&HashSet<TupleId>>> {
        let mut sets = Vec::new();
        for (position, value) in pattern.concrete_fields() {
            match self.index[position].get(value) {
                Some(set) if !set.is_empty() => sets.push(set),
                _ => return None,
            }
        }
        Some(sets)
    }

    /// Ids present in every candidate set, scanning the smallest
    fn matching_ids<'a>(
        &'a self,
        pattern: &Pattern,
    ) -> Option<Box<dyn Iterator<Item = TupleId> + 'a>> {
        let mut sets = self.candidate_sets(pattern)?;
        if sets.is_empty() {
            return Some(Box::new(self.tuples.keys().copied()));
        }

        let smallest = sets
            .iter()
            .enumerate()
            .min_by_key(|(_, set)| set.len())
            .map(|(i, _)| i)?;
        let scan = sets.swap_remove(smallest);

        Some(Box::new(
            scan.iter()
                .copied()
                .filter(move |id| sets.iter().all(|other| other.contains(id))),
        ))
    }

    fn first_match(&self, pattern: &Pattern) -> Option<TupleId> {
        self.matching_ids(pattern)?.next()
    }

    fn remove(&mut self, id: TupleId) -> Result<Tuple, TupleSpaceError> {
        let tuple = self.tuples.remove(&id).ok_or_else(|| {
            TupleSpaceError::Inconsistent(format!("indexed tuple {} missing from primary", id))
        })?;

        for (position, value) in tuple.fields().iter().enumerate() {
            let column = &mut self.index[position];
            let missing = || {
                TupleSpaceError::Inconsistent(format!(
                    "tuple {} missing from index at position {}",
                    id, position
                ))
            };
            let emptied = match column.get_mut(value) {
                Some(set) => {
                    if !set.remove(&id) {
                        return Err(missing());
                    }
                    set.is_empty()
                }
                None => return Err(missing()),
            };
            if emptied {
                column.remove(value);
            }
        }

        Ok(tuple)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: TupleId,
    partitions: HashMap<usize, ArityPartition>,
    len: usize,
}

/// The authoritative collection of present tuples
///
/// ## Thread Safety
/// Every method takes the store guard for its whole duration and releases it
/// before returning; callers never hold it across a wait.
#[derive(Debug, Default)]
pub struct TupleStore {
    inner: Mutex<StoreInner>,
}

impl TupleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tuple, creating its arity partition on first use
    pub fn insert(&self, tuple: Tuple) -> TupleId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let arity = tuple.arity();
        inner
            .partitions
            .entry(arity)
            .or_insert_with(|| ArityPartition::new(arity))
            .insert(id, tuple);
        inner.len += 1;
        id
    }

    /// Find one tuple matching `pattern`, removing it when `mode` says so
    ///
    /// ## Errors
    /// `TupleSpaceError::Inconsistent` if the indexes reference a tuple the
    /// primary collection does not hold.
    pub fn find(&self, pattern: &Pattern, mode: SearchMode) -> Result<Option<Tuple>, TupleSpaceError> {
        let mut inner = self.inner.lock();
        let Some(partition) = inner.partitions.get_mut(&pattern.arity()) else {
            return Ok(None);
        };
        let Some(id) = partition.first_match(pattern) else {
            return Ok(None);
        };

        match mode {
            SearchMode::Keep => partition.tuples.get(&id).cloned().map(Some).ok_or_else(|| {
                let err = TupleSpaceError::Inconsistent(format!(
                    "indexed tuple {} missing from primary",
                    id
                ));
                tracing::error!(pattern = %pattern, "{}", err);
                err
            }),
            SearchMode::Remove => {
                let tuple = partition.remove(id).map_err(|err| {
                    tracing::error!(pattern = %pattern, "{}", err);
                    err
                })?;
                inner.len -= 1;
                Ok(Some(tuple))
            }
        }
    }

    /// All tuples matching `pattern`
    pub fn find_all(&self, pattern: &Pattern) -> Vec<Tuple> {
        let inner = self.inner.lock();
        let Some(partition) = inner.partitions.get(&pattern.arity()) else {
            return Vec::new();
        };
        let found = match partition.matching_ids(pattern) {
            Some(ids) => ids
                .filter_map(|id| partition.tuples.get(&id).cloned())
                .collect(),
            None => Vec::new(),
        };
        found
    }

    /// Number of tuples matching `pattern`
    pub fn count(&self, pattern: &Pattern) -> usize {
        let inner = self.inner.lock();
        inner
            .partitions
            .get(&pattern.arity())
            .and_then(|partition| partition.matching_ids(pattern))
            .map(|ids| ids.count())
            .unwrap_or(0)
    }

    /// Remove every tuple matching `pattern`
    pub fn remove_all(&self, pattern: &Pattern) -> Result<Vec<Tuple>, TupleSpaceError> {
        let mut inner = self.inner.lock();
        let Some(partition) = inner.partitions.get_mut(&pattern.arity()) else {
            return Ok(Vec::new());
        };
        let ids: Vec<TupleId> = match partition.matching_ids(pattern) {
            Some(ids) => ids.collect(),
            None => return Ok(Vec::new()),
        };

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            match partition.remove(id) {
                Ok(tuple) => removed.push(tuple),
                Err(err) => {
                    tracing::error!(pattern = %pattern, "{}", err);
                    inner.len -= removed.len();
                    return Err(err);
                }
            }
        }
        inner.len -= removed.len();
        Ok(removed)
    }

    /// Total number of tuples
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// True when no tuples are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arities that currently hold at least one tuple, ascending
    pub fn arities(&self) -> Vec<usize> {
        let inner = self.inner.lock();
        let mut arities: Vec<usize> = inner
            .partitions
            .iter()
            .filter(|(_, partition)| !partition.tuples.is_empty())
            .map(|(arity, _)| *arity)
            .collect();
        arities.sort_unstable();
        arities
    }

    /// Copy of every stored tuple, ordered by insertion
    pub fn snapshot(&self) -> Vec<Tuple> {
        let inner = self.inner.lock();
        let mut entries: Vec<(TupleId, Tuple)> = inner
            .partitions
            .values()
            .flat_map(|partition| {
                partition
                    .tuples
                    .iter()
                    .map(|(id, tuple)| (*id, tuple.clone()))
            })
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, tuple)| tuple).collect()
    }

    /// Drop every tuple; returns how many were removed
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.len;
        inner.partitions.clear();
        inner.len = 0;
        removed
    }
}
