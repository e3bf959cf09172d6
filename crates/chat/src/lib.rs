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


//! Bounded-history broadcast channels over a tuple space
//!
//! ## Purpose
//! Every writer's message reaches every listener connected to the channel,
//! with at most `rows` messages retained per channel. All state lives in the
//! tuple space as tuples keyed by channel name and role, and every
//! read-modify-write is a `consume` followed by an `insert`.
//!
//! ## State Tuples
//! - `("chs", set)`: channel registry, see [`ChannelSet`]
//! - `(ch, "nxw", n)`: next write position; holding it excludes other writers
//! - `(ch, "con", listeners, last)`: listener count and last readable position
//! - `(ch, "sgl", pos, pending)`: listeners still to read slot `pos`
//! - `(ch, "msg", pos, text)`: message payload
//!
//! ## Example
//! ```rust
//! use lindaspaces_chat::ChatServer;
//! use lindaspaces_tuplespace::TupleSpace;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let space = TupleSpace::new();
//! ChatServer::bootstrap(&space)?;
//! let server = ChatServer::new(space, 8, &["lobby"])?;
//!
//! let mut listener = server.open_connection("lobby")?;
//! server.write_message("lobby", "hello")?;
//! assert_eq!(listener.next_message()?, "hello");
//! listener.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel_set;
pub mod error;
pub mod listener;
pub mod server;

pub use channel_set::ChannelSet;
pub use error::{ChatError, ChatResult};
pub use listener::ChatListener;
pub use server::ChatServer;

use lindaspaces_tuplespace::Tuple;
use std::str::FromStr;

/// Role tag of the channel registry tuple
pub const CHANNEL_SET: &str = "chs";
/// Role tag of the next write position
pub const NEXT_WRITE: &str = "nxw";
/// Role tag of the listener count and last readable position
pub const CONNECTIONS: &str = "con";
/// Role tag of the per-slot pending reader count
pub const SIGNALS: &str = "sgl";
/// Role tag of a message payload
pub const MESSAGE: &str = "msg";

/// Parse field `position` of a state tuple
pub(crate) fn parse_field<T: FromStr>(tuple: &Tuple, position: usize) -> ChatResult<T> {
    let raw = tuple.field(position).unwrap_or_default();
    raw.parse().map_err(|_| ChatError::CorruptState {
        key: tuple.to_string(),
        value: raw.to_string(),
    })
}
