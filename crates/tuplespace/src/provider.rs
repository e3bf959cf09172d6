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

//! TupleSpaceProvider trait and capability system
//!
//! ## Purpose
//! Async surface over a tuple space so tokio tasks can coordinate through the
//! same space as plain threads. Blocking retrievals run on the blocking pool
//! (`tokio::task::spawn_blocking`) and hand their result back over a oneshot
//! channel.
//!
//! ## Cancellation
//! Dropping a pending `consume` future does not stop the worker thread. If the
//! worker later removes a tuple and finds nobody listening, it inserts the
//! tuple back, so an abandoned async consume never loses a tuple.
//!
//! ## Example
//! ```rust
//! use lindaspaces_tuplespace::provider::TupleSpaceProvider;
//! use lindaspaces_tuplespace::{pattern, tuple, TupleSpace};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let space = TupleSpace::new();
//! TupleSpaceProvider::write(&space, tuple!("job", "1")).await?;
//! let job = TupleSpaceProvider::consume(&space, &pattern!("job", _)).await?;
//! assert_eq!(job, tuple!("job", "1"));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::store::SearchMode;
use crate::{Pattern, Tuple, TupleSpace, TupleSpaceError, TupleSpaceStats, WakePolicy};

/// TupleSpaceProvider trait - async abstraction over tuple space implementations
///
/// ## Capabilities Map
/// - `"storage"`: Backend type ("memory")
/// - `"storage.persistent"`: "true" or "false"
/// - `"indexing"`: "none" or "field" (per-position value indexes)
/// - `"blocking"`: "enabled" or "disabled" (consume/peek wait for a match)
/// - `"wake_policy"`: "broadcast" or "single"
#[async_trait]
pub trait TupleSpaceProvider: Send + Sync {
    /// Returns the capabilities of this provider
    fn capabilities(&self) -> HashMap<String, String>;

    /// Name of the space behind this provider
    fn name(&self) -> &str;

    /// Write a tuple to the space
    async fn write(&self, tuple: Tuple) -> Result<(), TupleSpaceError>;

    /// All tuples currently matching `pattern` (non-blocking, non-destructive)
    async fn read(&self, pattern: &Pattern) -> Result<Vec<Tuple>, TupleSpaceError>;

    /// Remove a match if one is present right now (non-blocking)
    async fn take(&self, pattern: &Pattern) -> Result<Option<Tuple>, TupleSpaceError>;

    /// Wait for a match, then remove and return it
    async fn consume(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        let _ = pattern;
        Err(TupleSpaceError::NotSupported(
            "Blocking consume not supported by this provider".to_string(),
        ))
    }

    /// Wait for a match, then return a copy of it
    async fn peek(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        let _ = pattern;
        Err(TupleSpaceError::NotSupported(
            "Blocking peek not supported by this provider".to_string(),
        ))
    }

    /// Count tuples matching pattern
    async fn count(&self, pattern: &Pattern) -> Result<usize, TupleSpaceError> {
        let tuples = self.read(pattern).await?;
        Ok(tuples.len())
    }

    /// Clear all tuples from the space
    async fn clear(&self) -> Result<(), TupleSpaceError> {
        Err(TupleSpaceError::NotSupported(
            "Clear not supported by this provider".to_string(),
        ))
    }

    /// Get statistics about the space
    async fn stats(&self) -> Result<TupleSpaceStats, TupleSpaceError> {
        Ok(TupleSpaceStats::default())
    }
}

impl TupleSpace {
    /// Run a blocking retrieval on the blocking pool
    async fn retrieve_blocking(
        &self,
        pattern: &Pattern,
        mode: SearchMode,
    ) -> Result<Tuple, TupleSpaceError> {
        let space = self.clone();
        let pattern = pattern.clone();
        let (tx, rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let result = match mode {
                SearchMode::Remove => space.consume(&pattern),
                SearchMode::Keep => space.peek(&pattern),
            };
            if let Err(Ok(tuple)) = tx.send(result) {
                if mode == SearchMode::Remove {
                    tracing::debug!(
                        space = %space.name(),
                        tuple = %tuple,
                        "Async consume abandoned, returning tuple to the space"
                    );
                    if let Err(e) = space.insert(tuple) {
                        tracing::error!(space = %space.name(), "Failed to return abandoned tuple: {}", e);
                    }
                }
            }
        });

        rx.await.map_err(|_| {
            TupleSpaceError::Interrupted("blocking worker terminated before replying".to_string())
        })?
    }
}

#[async_trait]
impl TupleSpaceProvider for TupleSpace {
    fn capabilities(&self) -> HashMap<String, String> {
        let mut capabilities = HashMap::new();
        capabilities.insert("storage".to_string(), "memory".to_string());
        capabilities.insert("storage.persistent".to_string(), "false".to_string());
        capabilities.insert("indexing".to_string(), "field".to_string());
        capabilities.insert("blocking".to_string(), "enabled".to_string());
        let policy = match self.wake_policy() {
            WakePolicy::Broadcast => "broadcast",
            WakePolicy::Single => "single",
        };
        capabilities.insert("wake_policy".to_string(), policy.to_string());
        capabilities
    }

    fn name(&self) -> &str {
        TupleSpace::name(self)
    }

    async fn write(&self, tuple: Tuple) -> Result<(), TupleSpaceError> {
        self.insert(tuple)
    }

    async fn read(&self, pattern: &Pattern) -> Result<Vec<Tuple>, TupleSpaceError> {
        Ok(self.peek_all(pattern))
    }

    async fn take(&self, pattern: &Pattern) -> Result<Option<Tuple>, TupleSpaceError> {
        self.try_consume(pattern)
    }

    async fn consume(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        self.retrieve_blocking(pattern, SearchMode::Remove).await
    }

    async fn peek(&self, pattern: &Pattern) -> Result<Tuple, TupleSpaceError> {
        self.retrieve_blocking(pattern, SearchMode::Keep).await
    }

    async fn count(&self, pattern: &Pattern) -> Result<usize, TupleSpaceError> {
        Ok(TupleSpace::count(self, pattern))
    }

    async fn clear(&self) -> Result<(), TupleSpaceError> {
        TupleSpace::clear(self);
        Ok(())
    }

    async fn stats(&self) -> Result<TupleSpaceStats, TupleSpaceError> {
        Ok(TupleSpace::stats(self))
    }
}

/// Helper functions for working with capabilities
pub struct CapabilityHelpers;

impl CapabilityHelpers {
    /// Check if provider has a specific capability
    pub fn has_capability(caps: &HashMap<String, String>, key: &str, value: &str) -> bool {
        caps.get(key).map(|v| v == value).unwrap_or(false)
    }

    /// Check if provider is persistent
    pub fn is_persistent(caps: &HashMap<String, String>) -> bool {
        Self::has_capability(caps, "storage.persistent", "true")
    }

    /// Check if provider supports blocking consume/peek
    pub fn supports_blocking(caps: &HashMap<String, String>) -> bool {
        Self::has_capability(caps, "blocking", "enabled")
    }

    /// Check if provider indexes tuple fields
    pub fn is_indexed(caps: &HashMap<String, String>) -> bool {
        caps.get("indexing").map(|v| v != "none").unwrap_or(false)
    }

    /// Get wake policy
    pub fn wake_policy(caps: &HashMap<String, String>) -> Option<WakePolicy> {
        caps.get("wake_policy").and_then(|v| v.parse().ok())
    }

    /// Get storage backend type
    pub fn storage_type(caps: &HashMap<String, String>) -> Option<&str> {
        caps.get("storage").map(|s| s.as_str())
    }
}

/// Type alias for boxed providers
pub type BoxedProvider = Box<dyn TupleSpaceProvider>;

/// Type alias for Arc-wrapped providers (for sharing across threads)
pub type SharedProvider = Arc<dyn TupleSpaceProvider>;
