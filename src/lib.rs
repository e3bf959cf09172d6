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


//! LindaSpaces: tuple space coordination for threads
//!
//! Threads coordinate by inserting string tuples into a shared space and
//! retrieving them by pattern, blocking until a match exists.
//!
//! - [`tuplespace`]: the engine (indexed store, wait registry, blocking facade)
//! - [`chat`]: bounded-history broadcast channels built only from
//!   insert/consume/peek
//! - [`tracing_setup`]: subscriber setup for binaries and tests

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use lindaspaces_chat as chat;
pub use lindaspaces_tuplespace as tuplespace;

pub mod tracing_setup;

pub use lindaspaces_tuplespace::{pattern, tuple, Pattern, Tuple, TupleSpace, TupleSpaceConfig};
