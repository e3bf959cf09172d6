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


//! Error types for chat operations.

use lindaspaces_tuplespace::TupleSpaceError;
use thiserror::Error;

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur during chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Underlying tuple space rejected an operation
    #[error("Tuple space error: {0}")]
    Space(#[from] TupleSpaceError),

    /// Channel is not registered in the shared channel set
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A state tuple held a value that does not parse
    #[error("Corrupt state for {key}: {value:?}")]
    CorruptState {
        /// Channel and role of the offending tuple
        key: String,
        /// Raw field value
        value: String,
    },

    /// Channel already registered with a different history size
    #[error("Channel {channel} has {existing} rows, requested {requested}")]
    RowsMismatch {
        /// Channel name
        channel: String,
        /// Rows already registered
        existing: usize,
        /// Rows requested by the caller
        requested: usize,
    },

    /// Channel history must hold at least one message
    #[error("Channel {channel} needs at least one row, got {rows}")]
    InvalidRows {
        /// Channel name
        channel: String,
        /// Rows requested
        rows: usize,
    },

    /// Channel name is empty or contains a reserved separator
    #[error("Invalid channel name: {0:?}")]
    InvalidChannelName(String),
}
