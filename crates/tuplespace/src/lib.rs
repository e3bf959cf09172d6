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


//! Linda-style tuple space coordination
//!
//! Threads coordinate by inserting tuples (ordered sequences of strings) into a
//! shared space and retrieving them by pattern. A pattern field is either an
//! exact value or a wildcard; `consume` removes a match, `peek` copies one, and
//! both block the calling thread until a match exists.
//!
//! ## Layout
//! - [`tuple`]: `Tuple`, `Pattern` and the `tuple!`/`pattern!` macros
//! - [`store`]: arity-partitioned store with per-position value indexes
//! - [`registry`]: one wait handle per distinct blocked pattern
//! - [`space`]: the `TupleSpace` facade tying store and registry together
//! - [`config`]: CODE/ENV/FILE/DEFAULT configuration
//! - [`provider`]: async provider trait over the blocking space
//!
//! ## Example
//! ```rust
//! use lindaspaces_tuplespace::{pattern, tuple, TupleSpace};
//!
//! let space = TupleSpace::new();
//! space.insert(tuple!("chat", "msg", "0", "hello")).unwrap();
//! let msg = space.peek(&pattern!("chat", "msg", "0", _)).unwrap();
//! assert_eq!(msg.field(3), Some("hello"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod space;
pub mod store;
pub mod tuple;

// Re-export main types
pub use config::TupleSpaceConfig;
pub use error::{TupleSpaceError, TupleSpaceResult};
pub use provider::{CapabilityHelpers, SharedProvider, TupleSpaceProvider};
pub use registry::{WaitGuard, WaitHandle, WaitRegistry, WakePolicy};
pub use space::{TupleSpace, TupleSpaceStats};
pub use store::{SearchMode, TupleId, TupleStore};
pub use tuple::{Pattern, PatternField, Tuple};
