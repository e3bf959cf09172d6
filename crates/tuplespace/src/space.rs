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

//! TupleSpace facade
//!
//! ## Purpose
//! Composes the indexed [`TupleStore`] and the [`WaitRegistry`] into the
//! three coordination primitives:
//! - [`TupleSpace::insert`]: add a tuple and route a wake; never blocks
//! - [`TupleSpace::consume`]: block until a match exists, remove and return it
//! - [`TupleSpace::peek`]: block until a match exists, return a copy
//!
//! ## Blocking Calls
//! `REGISTERING -> WAITING <-> CHECKING -> MATCHED`. A blocking call registers
//! on the handle for its pattern, then alternates store checks and waits. The
//! store guard is held only for each check, never across a wait. A peek that
//! matches re-routes a wake for the tuple it saw, since the tuple stays and
//! may satisfy other blocked patterns.
//!
//! The base calls have no cancellation. The `_timeout` variants bound the
//! wait; every exit path, including unwinding, releases the handle reference.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::store::SearchMode;
use crate::{
    Pattern, Tuple, TupleSpaceConfig, TupleSpaceError, TupleStore, WaitRegistry, WakePolicy,
};

/// Statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TupleSpaceStats {
    total_inserts: u64,
    rejected_inserts: u64,
    total_consumes: u64,
    total_peeks: u64,
    total_wakeups: u64,
    current_size: usize,
    waiting_handles: usize,
}

impl TupleSpaceStats {
    /// Get total number of accepted inserts
    pub fn total_inserts(&self) -> u64 {
        self.total_inserts
    }

    /// Get total number of rejected inserts
    pub fn rejected_inserts(&self) -> u64 {
        self.rejected_inserts
    }

    /// Get total number of tuples consumed
    pub fn total_consumes(&self) -> u64 {
        self.total_consumes
    }

    /// Get total number of successful peeks
    pub fn total_peeks(&self) -> u64 {
        self.total_peeks
    }

    /// Get total number of wait-handle signals sent
    pub fn total_wakeups(&self) -> u64 {
        self.total_wakeups
    }

    /// Get current number of tuples in the space
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// Get number of patterns with blocked callers
    pub fn waiting_handles(&self) -> usize {
        self.waiting_handles
    }
}

struct SpaceInner {
    config: TupleSpaceConfig,
    store: TupleStore,
    registry: WaitRegistry,
    stats: RwLock<TupleSpaceStats>,
}

/// TupleSpace for coordination
///
/// Cloning is cheap and every clone refers to the same space.
#[derive(Clone)]
pub struct TupleSpace {
    inner: Arc<SpaceInner>,
}

impl std::fmt::Debug for TupleSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleSpace")
            .field("name", &self.inner.config.name)
            .field("size", &self.inner.store.len())
            .field("waiting", &self.inner.registry.len())
            .finish()
    }
}

impl Default for TupleSpace {
    fn default() -> Self {
        Self::with_config(TupleSpaceConfig::default())
    }
}

impl TupleSpace {
    /// Create an empty space with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty space from an already validated configuration
    pub fn with_config(config: TupleSpaceConfig) -> Self {
        tracing::debug!(
            name = %config.name,
            wake_policy = ?config.wake_policy,
            recheck_interval_ms = config.recheck_interval_ms,
            "Creating tuple space"
        );
        TupleSpace {
            inner: Arc::new(SpaceInner {
                registry: WaitRegistry::new(config.wake_policy),
                store: TupleStore::new(),
                stats: RwLock::new(TupleSpaceStats::default()),
                config,
            }),
        }
    }

    /// Name used in logs and metrics
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Configuration in effect
    pub fn config(&self) -> &TupleSpaceConfig {
        &self.inner.config
    }

    /// Wake routing policy in effect
    pub fn wake_policy(&self) -> WakePolicy {
        self.inner.registry.policy()
    }

    /// Add a tuple to the space and wake a matching blocked caller
    ///
    /// ## Errors
    /// `TupleSpaceError::EmptyTuple` for a tuple with no fields; nothing is stored.
    pub fn insert(&self, tuple: Tuple) -> Result<(), TupleSpaceError> {
        if tuple.arity() == 0 {
            return Err(self.reject(TupleSpaceError::EmptyTuple));
        }

        self.inner.store.insert(tuple.clone());
        let woken = self.inner.registry.signal_matching(&tuple);
        tracing::debug!(space = %self.name(), tuple = %tuple, woken, "Inserted tuple");

        {
            let mut stats = self.inner.stats.write();
            stats.total_inserts += 1;
            stats.total_wakeups += woken as u64;
        }
        if self.inner.config.metrics_enabled {
            metrics::counter!("lindaspaces_tuplespace_inserts_total", "space" => self.name().to_string())
                .increment(1);
            metrics::counter!("lindaspaces_tuplespace_wakeups_total", "space" => self.name().to_string())
                .increment(woken as u64);
            metrics::gauge!("lindaspaces_tuplespace_size", "space" => self.name().to_string())
                .set(self.inner.store.len() as f64);
        }
        Ok(())
    }

    /// Insert fields that may be missing
    ///
    /// ## Errors
    /// `TupleSpaceError::MalformedTuple` if any field is `None`; nothing is
    /// stored and no caller is woken.
    pub fn insert_fields(&self, fields: Vec<Option<String>>) -> Result<(), TupleSpaceError> {
        match Tuple::try_from_fields(fields) {
            Ok(tuple) => self.insert(tuple),
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Block until a tuple matches `pattern`, then remove and return it
    pub fn consume(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        self.retrieve(pattern, SearchMode::Remove, None)?
            .ok_or_else(|| TupleSpaceError::Interrupted("consume ended without a match".to_string()))
    }

    /// Block until a tuple matches `pattern`, then return a copy of it
    pub fn peek(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        self.retrieve(pattern, SearchMode::Keep, None)?
            .ok_or_else(|| TupleSpaceError::Interrupted("peek ended without a match".to_string()))
    }

    /// Like [`consume`](Self::consume) but gives up after `timeout`
    pub fn consume_timeout(
        &self,
        pattern: &Pattern,
        timeout: Duration,
    ) -> Result<Option<Tuple>, TupleSpaceError> {
        self.retrieve(pattern, SearchMode::Remove, Some(timeout))
    }

    /// Like [`peek`](Self::peek) but gives up after `timeout`
    pub fn peek_timeout(
        &self,
        pattern: &Pattern,
        timeout: Duration,
    ) -> Result<Option<Tuple>, TupleSpaceError> {
        self.retrieve(pattern, SearchMode::Keep, Some(timeout))
    }

    /// Remove and return a match if one is present right now
    pub fn try_consume(&self, pattern: &Pattern) -> Result<Option<Tuple>, TupleSpaceError> {
        Self::check_pattern(pattern)?;
        let found = self.inner.store.find(pattern, SearchMode::Remove)?;
        if let Some(tuple) = &found {
            self.record_match(SearchMode::Remove, tuple);
        }
        Ok(found)
    }

    /// Copy of a match if one is present right now
    pub fn try_peek(&self, pattern: &Pattern) -> Result<Option<Tuple>, TupleSpaceError> {
        Self::check_pattern(pattern)?;
        let found = self.inner.store.find(pattern, SearchMode::Keep)?;
        if let Some(tuple) = &found {
            self.record_match(SearchMode::Keep, tuple);
        }
        Ok(found)
    }

    /// Remove every tuple matching `pattern` without blocking
    pub fn consume_all(&self, pattern: &Pattern) -> Result<Vec<Tuple>, TupleSpaceError> {
        Self::check_pattern(pattern)?;
        let taken = self.inner.store.remove_all(pattern)?;
        for tuple in &taken {
            self.record_match(SearchMode::Remove, tuple);
        }
        Ok(taken)
    }

    /// Copies of every tuple matching `pattern`
    pub fn peek_all(&self, pattern: &Pattern) -> Vec<Tuple> {
        self.inner.store.find_all(pattern)
    }

    /// Count tuples matching pattern
    pub fn count(&self, pattern: &Pattern) -> usize {
        self.inner.store.count(pattern)
    }

    /// Number of tuples in the space
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// True when the space holds no tuples
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Copy of every tuple, in insertion order
    pub fn snapshot(&self) -> Vec<Tuple> {
        self.inner.store.snapshot()
    }

    /// Patterns with blocked callers and how many callers each has
    pub fn waiting_patterns(&self) -> Vec<(Pattern, usize)> {
        self.inner.registry.waiting_patterns()
    }

    /// Clear all tuples; blocked callers keep waiting
    pub fn clear(&self) -> usize {
        let removed = self.inner.store.clear();
        tracing::debug!(space = %self.name(), removed, "Cleared tuple space");
        removed
    }

    /// Get space statistics
    pub fn stats(&self) -> TupleSpaceStats {
        let mut stats = self.inner.stats.read().clone();
        stats.current_size = self.inner.store.len();
        stats.waiting_handles = self.inner.registry.len();
        stats
    }

    fn check_pattern(pattern: &Pattern) -> Result<(), TupleSpaceError> {
        if pattern.arity() == 0 {
            return Err(TupleSpaceError::EmptyPattern);
        }
        Ok(())
    }

    fn retrieve(
        &self,
        pattern: &Pattern,
        mode: SearchMode,
        timeout: Option<Duration>,
    ) -> Result<Option<Tuple>, TupleSpaceError> {
        Self::check_pattern(pattern)?;

        // Present already: no need to register.
        if let Some(tuple) = self.inner.store.find(pattern, mode)? {
            self.record_match(mode, &tuple);
            return Ok(Some(tuple));
        }

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let recheck = self.inner.config.recheck_interval();
        let mut guard = self.inner.registry.acquire(pattern);
        self.publish_waiting();

        let tuple = loop {
            guard.begin_check();
            if let Some(tuple) = self.inner.store.find(pattern, mode)? {
                guard.succeeded();
                break tuple;
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                tracing::debug!(space = %self.name(), pattern = %pattern, "Blocking call timed out");
                drop(guard);
                self.publish_waiting();
                return Ok(None);
            }

            let wake_at = match (deadline, recheck.map(|interval| now + interval)) {
                (Some(deadline), Some(poll)) => Some(deadline.min(poll)),
                (deadline, poll) => deadline.or(poll),
            };
            let signalled = guard.wait(wake_at);
            tracing::trace!(space = %self.name(), pattern = %pattern, signalled, "Rechecking store");
        };
        drop(guard);
        self.publish_waiting();

        self.record_match(mode, &tuple);
        if mode == SearchMode::Keep {
            // The tuple is still present and may satisfy other waiting patterns.
            let woken = self.inner.registry.signal_matching(&tuple);
            if woken > 0 {
                self.inner.stats.write().total_wakeups += woken as u64;
                tracing::debug!(space = %self.name(), tuple = %tuple, woken, "Re-routed wake after peek");
            }
        }
        Ok(Some(tuple))
    }

    fn record_match(&self, mode: SearchMode, tuple: &Tuple) {
        {
            let mut stats = self.inner.stats.write();
            match mode {
                SearchMode::Remove => stats.total_consumes += 1,
                SearchMode::Keep => stats.total_peeks += 1,
            }
        }
        tracing::debug!(space = %self.name(), tuple = %tuple, mode = ?mode, "Matched tuple");

        if self.inner.config.metrics_enabled {
            match mode {
                SearchMode::Remove => {
                    metrics::counter!("lindaspaces_tuplespace_consumes_total", "space" => self.name().to_string())
                        .increment(1);
                    metrics::gauge!("lindaspaces_tuplespace_size", "space" => self.name().to_string())
                        .set(self.inner.store.len() as f64);
                }
                SearchMode::Keep => {
                    metrics::counter!("lindaspaces_tuplespace_peeks_total", "space" => self.name().to_string())
                        .increment(1);
                }
            }
        }
    }

    fn publish_waiting(&self) {
        if self.inner.config.metrics_enabled {
            metrics::gauge!("lindaspaces_tuplespace_waiting_handles", "space" => self.name().to_string())
                .set(self.inner.registry.len() as f64);
        }
    }

    fn reject(&self, err: TupleSpaceError) -> TupleSpaceError {
        tracing::warn!(space = %self.name(), "Rejected insert: {}", err);
        self.inner.stats.write().rejected_inserts += 1;
        if self.inner.config.metrics_enabled {
            metrics::counter!("lindaspaces_tuplespace_rejected_total", "space" => self.name().to_string())
                .increment(1);
        }
        err
    }
}
