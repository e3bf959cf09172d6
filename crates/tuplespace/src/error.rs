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

//! Error types for tuplespace operations.

use thiserror::Error;

/// Result type for tuplespace operations.
pub type TupleSpaceResult<T> = Result<T, TupleSpaceError>;

/// TupleSpace errors
#[derive(Debug, Error)]
pub enum TupleSpaceError {
    /// Insert with a missing field; nothing was stored
    #[error("Malformed tuple: field {position} is missing")]
    MalformedTuple {
        /// Position of the first missing field
        position: usize,
    },

    /// Insert of a tuple with no fields
    #[error("Malformed tuple: a tuple needs at least one field")]
    EmptyTuple,

    /// Retrieval with a pattern of no fields (can never match)
    #[error("Pattern error: a pattern needs at least one field")]
    EmptyPattern,

    /// Store indexes or registry reference counts disagree
    #[error("Internal consistency fault: {0}")]
    Inconsistent(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Blocking call terminated abnormally
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// Feature not supported by this provider
    #[error("Not supported: {0}")]
    NotSupported(String),
}
