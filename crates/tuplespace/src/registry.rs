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

//! Wait registry and wake routing
//!
//! ## Purpose
//! Maps a pattern value to a shared [`WaitHandle`] so every thread blocked on a
//! structurally identical pattern sleeps on the same condition variable, and an
//! inserted tuple wakes only handles whose pattern it satisfies.
//!
//! ## Protocol
//! 1. [`WaitRegistry::acquire`] looks up or creates the handle and bumps its
//!    reference count, returning a [`WaitGuard`].
//! 2. Before every store check the guard snapshots the handle generation
//!    ([`WaitGuard::begin_check`]); [`WaitGuard::wait`] sleeps only while the
//!    generation is unchanged. A signal landing between the check and the
//!    sleep therefore cannot be lost.
//! 3. Dropping the guard releases the reference; the handle leaves the
//!    registry when the count reaches zero.
//!
//! ## Single-handle routing
//! Under [`WakePolicy::Single`] a signal may reach a handle whose last thread
//! is already leaving with another tuple. Each handle keeps a credit per
//! signal, spent by successes that followed a wake; when the last reference
//! goes with credits left, the signal is forwarded to every other handle of
//! the same arity.
//!
//! ## Lock Ordering
//! The registry lock and a handle lock are never held together, and neither
//! is held while the store is searched.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::{Pattern, Tuple};

/// How an inserted tuple is routed to blocked callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakePolicy {
    /// Signal every matching handle and wake every thread attached to it
    #[default]
    Broadcast,
    /// Signal exactly one matching handle and wake one thread on it
    Single,
}

#[derive(Debug, Default)]
struct HandleState {
    generation: u64,
    credits: u64,
}

/// Synchronization token shared by all threads blocked on one pattern value
#[derive(Debug)]
pub struct WaitHandle {
    pattern: Pattern,
    state: Mutex<HandleState>,
    condvar: Condvar,
}

impl WaitHandle {
    fn new(pattern: Pattern) -> Self {
        WaitHandle {
            pattern,
            state: Mutex::new(HandleState::default()),
            condvar: Condvar::new(),
        }
    }

    /// Pattern this handle waits on
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Current signal generation
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn signal(&self, wake_all: bool) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.credits += 1;
        if wake_all {
            self.condvar.notify_all();
        } else {
            self.condvar.notify_one();
        }
    }

    fn spend_credit(&self) {
        let mut state = self.state.lock();
        state.credits = state.credits.saturating_sub(1);
    }

    fn credits(&self) -> u64 {
        self.state.lock().credits
    }

    /// Sleep until the generation moves past `seen` or `deadline` passes.
    /// Returns true when the generation moved.
    fn wait_past(&self, seen: u64, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        while state.generation == seen {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut state, deadline).timed_out() {
                        return state.generation != seen;
                    }
                }
                None => self.condvar.wait(&mut state),
            }
        }
        true
    }
}

#[derive(Debug)]
struct Registration {
    handle: Arc<WaitHandle>,
    refs: usize,
}

/// Registry of wait-handles keyed by pattern value
#[derive(Debug, Default)]
pub struct WaitRegistry {
    entries: Mutex<HashMap<Pattern, Registration>>,
    policy: WakePolicy,
}

impl WaitRegistry {
    /// Create an empty registry routing wakes with `policy`
    pub fn new(policy: WakePolicy) -> Self {
        WaitRegistry {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Routing policy in effect
    pub fn policy(&self) -> WakePolicy {
        self.policy
    }

    /// Look up or create the handle for `pattern` and take a reference on it
    pub fn acquire(&self, pattern: &Pattern) -> WaitGuard<'_> {
        let handle = {
            let mut entries = self.entries.lock();
            let registration = entries
                .entry(pattern.clone())
                .or_insert_with(|| Registration {
                    handle: Arc::new(WaitHandle::new(pattern.clone())),
                    refs: 0,
                });
            registration.refs += 1;
            registration.handle.clone()
        };

        let registered_at = handle.generation();
        tracing::trace!(pattern = %pattern, "Wait handle acquired");
        WaitGuard {
            registry: self,
            handle,
            seen: registered_at,
            registered_at,
        }
    }

    /// Signal handles whose pattern matches `tuple`
    ///
    /// Broadcast signals all of them; Single signals the first found. Returns
    /// the number of handles signalled.
    pub fn signal_matching(&self, tuple: &Tuple) -> usize {
        let targets: Vec<Arc<WaitHandle>> = {
            let entries = self.entries.lock();
            let matching = entries
                .values()
                .filter(|registration| registration.handle.pattern.matches(tuple))
                .map(|registration| registration.handle.clone());
            match self.policy {
                WakePolicy::Broadcast => matching.collect(),
                WakePolicy::Single => matching.take(1).collect(),
            }
        };

        let wake_all = self.policy == WakePolicy::Broadcast;
        for handle in &targets {
            tracing::debug!(pattern = %handle.pattern, tuple = %tuple, "Waking blocked callers");
            handle.signal(wake_all);
        }
        targets.len()
    }

    /// Signal every handle waiting on patterns of `arity`
    fn signal_arity(&self, arity: usize) -> usize {
        let targets: Vec<Arc<WaitHandle>> = {
            let entries = self.entries.lock();
            entries
                .values()
                .filter(|registration| registration.handle.pattern.arity() == arity)
                .map(|registration| registration.handle.clone())
                .collect()
        };
        for handle in &targets {
            handle.signal(true);
        }
        targets.len()
    }

    fn release(&self, handle: &Arc<WaitHandle>) {
        let orphaned = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&handle.pattern) {
                Some(registration) if Arc::ptr_eq(&registration.handle, handle) => {
                    if registration.refs == 0 {
                        tracing::error!(pattern = %handle.pattern, "Wait handle reference count underflow");
                        debug_assert!(false, "wait handle reference count underflow");
                        entries.remove(&handle.pattern);
                        true
                    } else {
                        registration.refs -= 1;
                        if registration.refs == 0 {
                            entries.remove(&handle.pattern);
                            true
                        } else {
                            false
                        }
                    }
                }
                _ => {
                    tracing::error!(pattern = %handle.pattern, "Released a wait handle that is not registered");
                    debug_assert!(false, "released an unregistered wait handle");
                    false
                }
            }
        };

        if orphaned && self.policy == WakePolicy::Single && handle.credits() > 0 {
            let forwarded = self.signal_arity(handle.pattern.arity());
            tracing::debug!(
                pattern = %handle.pattern,
                forwarded,
                "Forwarding signal from departed wait handle"
            );
        }
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no thread is blocked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered patterns with their reference counts
    pub fn waiting_patterns(&self) -> Vec<(Pattern, usize)> {
        let entries = self.entries.lock();
        let mut patterns: Vec<(Pattern, usize)> = entries
            .iter()
            .map(|(pattern, registration)| (pattern.clone(), registration.refs))
            .collect();
        patterns.sort();
        patterns
    }
}

/// A thread's reference to a wait-handle; released on drop
#[derive(Debug)]
pub struct WaitGuard<'a> {
    registry: &'a WaitRegistry,
    handle: Arc<WaitHandle>,
    seen: u64,
    registered_at: u64,
}

impl WaitGuard<'_> {
    /// Pattern this guard waits on
    pub fn pattern(&self) -> &Pattern {
        &self.handle.pattern
    }

    /// Snapshot the generation; call before every store check
    pub fn begin_check(&mut self) {
        self.seen = self.handle.generation();
    }

    /// Sleep until signalled after the last `begin_check`, or until `deadline`.
    /// Returns true when a signal arrived.
    pub fn wait(&self, deadline: Option<Instant>) -> bool {
        self.handle.wait_past(self.seen, deadline)
    }

    /// Record that the last check succeeded
    pub fn succeeded(&self) {
        if self.seen != self.registered_at {
            self.handle.spend_credit();
        }
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.handle);
    }
}
