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


//! Chat server: channel registration, writers and connection setup

use parking_lot::RwLock;

use lindaspaces_tuplespace::{pattern, tuple, Tuple, TupleSpace};

use crate::channel_set::{validate_channel_name, ChannelSet};
use crate::listener::ChatListener;
use crate::{
    parse_field, ChatError, ChatResult, CHANNEL_SET, CONNECTIONS, MESSAGE, NEXT_WRITE, SIGNALS,
};

/// Writes messages to channels and opens listener connections
///
/// Any number of servers may share one space; they coordinate only through
/// the state tuples. A server is `Sync` and may be shared between threads.
#[derive(Debug)]
pub struct ChatServer {
    space: TupleSpace,
    channels: RwLock<ChannelSet>,
}

impl ChatServer {
    /// Seed an empty channel set unless one is already present
    ///
    /// Run once per space before the first [`ChatServer::new`].
    pub fn bootstrap(space: &TupleSpace) -> ChatResult<()> {
        if space.try_peek(&pattern!(CHANNEL_SET, _))?.is_none() {
            space.insert(tuple!(CHANNEL_SET, ""))?;
            tracing::debug!(space = %space.name(), "Seeded empty channel set");
        }
        Ok(())
    }

    /// Register `channel_names` with `rows` of history and return a server
    ///
    /// Channels that already exist are joined as-is. Blocks until the
    /// channel set has been bootstrapped.
    ///
    /// ## Errors
    /// `RowsMismatch` if a channel exists with a different size;
    /// `InvalidRows`/`InvalidChannelName` for bad arguments.
    pub fn new(space: TupleSpace, rows: usize, channel_names: &[&str]) -> ChatResult<Self> {
        let held = space.consume(&pattern!(CHANNEL_SET, _))?;
        let mut channels = match decode_set(&held) {
            Ok(channels) => channels,
            Err(err) => {
                space.insert(held)?;
                return Err(err);
            }
        };

        let mut outcome = Ok(());
        for &name in channel_names {
            match channels.add(name, rows) {
                Ok(true) => {
                    space.insert(tuple!(name, NEXT_WRITE, "0"))?;
                    space.insert(tuple!(name, CONNECTIONS, "0", "-1"))?;
                    tracing::info!(channel = %name, rows, "Registered channel");
                }
                Ok(false) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        // Publish whatever was registered, even when a later name failed.
        space.insert(tuple!(CHANNEL_SET, channels.to_string()))?;
        outcome?;

        Ok(ChatServer {
            space,
            channels: RwLock::new(channels),
        })
    }

    /// Join the channels already registered in `space`
    pub fn attach(space: TupleSpace) -> ChatResult<Self> {
        let held = space.peek(&pattern!(CHANNEL_SET, _))?;
        let channels = decode_set(&held)?;
        Ok(ChatServer {
            space,
            channels: RwLock::new(channels),
        })
    }

    /// Space this server works on
    pub fn space(&self) -> &TupleSpace {
        &self.space
    }

    /// Names of all channels, refreshed from the shared channel set
    pub fn channels(&self) -> ChatResult<Vec<String>> {
        let held = self.space.consume(&pattern!(CHANNEL_SET, _))?;
        let shared = match decode_set(&held) {
            Ok(shared) => shared,
            Err(err) => {
                self.space.insert(held)?;
                return Err(err);
            }
        };

        let mut channels = self.channels.write();
        let added = channels.merge(&shared);
        if !added.is_empty() {
            tracing::debug!(channels = ?added, "Discovered channels");
        }
        self.space.insert(tuple!(CHANNEL_SET, channels.to_string()))?;
        Ok(channels.names())
    }

    /// History size of `channel`
    pub fn rows(&self, channel: &str) -> ChatResult<usize> {
        if let Some(rows) = self.channels.read().rows(channel) {
            return Ok(rows);
        }

        // Registered by another server after this one started.
        validate_channel_name(channel)?;
        let shared = decode_set(&self.space.peek(&pattern!(CHANNEL_SET, _))?)?;
        let mut channels = self.channels.write();
        channels.merge(&shared);
        channels
            .rows(channel)
            .ok_or_else(|| ChatError::UnknownChannel(channel.to_string()))
    }

    /// Append `message` to `channel`
    ///
    /// When the history is full, blocks until every listener has read the
    /// oldest retained message, then reclaims its slot.
    pub fn write_message(&self, channel: &str, message: &str) -> ChatResult<()> {
        let rows = self.rows(channel)?;
        let (cursor, next) = self.take_cursor(channel)?;

        let mut reclaimed = None;
        if next >= rows as u64 {
            let oldest = (next - rows as u64).to_string();
            let signal = self
                .space
                .consume(&pattern!(channel, SIGNALS, (oldest.as_str()), "0"))?;
            let payload = self
                .space
                .consume(&pattern!(channel, MESSAGE, (oldest.as_str()), _))?;
            tracing::trace!(channel = %channel, slot = %oldest, "Reclaimed oldest slot");
            reclaimed = Some((signal, payload));
        }

        let position = next.to_string();
        self.space
            .insert(tuple!(channel, MESSAGE, position.as_str(), message))?;

        let connections = self.space.consume(&pattern!(channel, CONNECTIONS, _, _))?;
        let listeners = match parse_field::<u64>(&connections, 2) {
            Ok(listeners) => listeners,
            Err(err) => {
                // Undo the write so the slot and cursor are as they were.
                self.space
                    .consume(&pattern!(channel, MESSAGE, (position.as_str()), _))?;
                if let Some((signal, payload)) = reclaimed {
                    self.space.insert(payload)?;
                    self.space.insert(signal)?;
                }
                self.space.insert(connections)?;
                self.space.insert(cursor)?;
                return Err(err);
            }
        };
        self.space.insert(tuple!(
            channel,
            SIGNALS,
            position.as_str(),
            listeners.to_string()
        ))?;
        self.space.insert(tuple!(
            channel,
            CONNECTIONS,
            listeners.to_string(),
            position.as_str()
        ))?;
        self.space
            .insert(tuple!(channel, NEXT_WRITE, (next + 1).to_string()))?;

        tracing::debug!(channel = %channel, position = next, listeners, "Wrote message");
        metrics::counter!("lindaspaces_chat_messages_written_total", "channel" => channel.to_string())
            .increment(1);
        Ok(())
    }

    /// Connect a new listener to `channel`
    ///
    /// The listener starts at the oldest retained message and will receive
    /// every message written after it.
    pub fn open_connection(&self, channel: &str) -> ChatResult<ChatListener> {
        let rows = self.rows(channel)?;
        let (cursor, next) = self.take_cursor(channel)?;
        let start = next.saturating_sub(rows as u64);

        let result = self.register_listener(channel, start, next);
        self.space.insert(cursor)?;
        result?;

        tracing::debug!(channel = %channel, start, "Opened connection");
        metrics::counter!("lindaspaces_chat_connections_opened_total", "channel" => channel.to_string())
            .increment(1);
        Ok(ChatListener::new(
            self.space.clone(),
            channel.to_string(),
            rows,
            start,
        ))
    }

    /// Owe a read of every retained slot and count one more listener
    fn register_listener(&self, channel: &str, start: u64, next: u64) -> ChatResult<()> {
        for position in start..next {
            let slot = position.to_string();
            let signal = self
                .space
                .consume(&pattern!(channel, SIGNALS, (slot.as_str()), _))?;
            let pending = match parse_field::<u64>(&signal, 3) {
                Ok(pending) => pending,
                Err(err) => {
                    self.space.insert(signal)?;
                    return Err(err);
                }
            };
            self.space.insert(tuple!(
                channel,
                SIGNALS,
                slot.as_str(),
                (pending + 1).to_string()
            ))?;
        }

        let connections = self.space.consume(&pattern!(channel, CONNECTIONS, _, _))?;
        let listeners = match parse_field::<u64>(&connections, 2) {
            Ok(listeners) => listeners,
            Err(err) => {
                self.space.insert(connections)?;
                return Err(err);
            }
        };
        let last = connections.field(3).unwrap_or("-1");
        self.space.insert(tuple!(
            channel,
            CONNECTIONS,
            (listeners + 1).to_string(),
            last
        ))?;
        Ok(())
    }

    /// Take the write cursor of `channel`, excluding other writers
    fn take_cursor(&self, channel: &str) -> ChatResult<(Tuple, u64)> {
        let cursor = self.space.consume(&pattern!(channel, NEXT_WRITE, _))?;
        match parse_field::<u64>(&cursor, 2) {
            Ok(next) => Ok((cursor, next)),
            Err(err) => {
                self.space.insert(cursor)?;
                Err(err)
            }
        }
    }
}

fn decode_set(held: &Tuple) -> ChatResult<ChannelSet> {
    held.field(1).unwrap_or_default().parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(rows: usize, channels: &[&str]) -> ChatServer {
        let space = TupleSpace::new();
        ChatServer::bootstrap(&space).unwrap();
        ChatServer::new(space, rows, channels).unwrap()
    }

    #[test]
    fn test_new_seeds_channel_state() {
        let server = server(3, &["news", "sports"]);
        let space = server.space();

        assert_eq!(server.channels().unwrap(), vec!["news", "sports"]);
        assert_eq!(
            space.try_peek(&pattern!("news", NEXT_WRITE, _)).unwrap(),
            Some(tuple!("news", NEXT_WRITE, "0"))
        );
        assert_eq!(
            space.try_peek(&pattern!("news", CONNECTIONS, _, _)).unwrap(),
            Some(tuple!("news", CONNECTIONS, "0", "-1"))
        );
        assert_eq!(space.count(&pattern!(CHANNEL_SET, _)), 1);
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let space = TupleSpace::new();
        ChatServer::bootstrap(&space).unwrap();
        ChatServer::bootstrap(&space).unwrap();
        assert_eq!(space.count(&pattern!(CHANNEL_SET, _)), 1);
    }

    #[test]
    fn test_rows_mismatch_keeps_channel_set() {
        let first = server(3, &["news"]);
        let err = ChatServer::new(first.space().clone(), 5, &["news"]).unwrap_err();
        assert!(matches!(err, ChatError::RowsMismatch { existing: 3, requested: 5, .. }));
        assert_eq!(first.space().count(&pattern!(CHANNEL_SET, _)), 1);
    }

    #[test]
    fn test_write_without_listeners_recycles_slots() {
        let server = server(2, &["news"]);
        for i in 0..5 {
            server.write_message("news", &format!("m{}", i)).unwrap();
        }

        let space = server.space();
        assert_eq!(space.count(&pattern!("news", MESSAGE, _, _)), 2);
        assert_eq!(
            space.try_peek(&pattern!("news", NEXT_WRITE, _)).unwrap(),
            Some(tuple!("news", NEXT_WRITE, "5"))
        );
        assert_eq!(
            space.try_peek(&pattern!("news", CONNECTIONS, _, _)).unwrap(),
            Some(tuple!("news", CONNECTIONS, "0", "4"))
        );
    }

    #[test]
    fn test_corrupt_connections_leaves_history_intact() {
        let server = server(2, &["news"]);
        for i in 0..2 {
            server.write_message("news", &format!("m{}", i)).unwrap();
        }

        let space = server.space();
        space.consume(&pattern!("news", CONNECTIONS, _, _)).unwrap();
        space
            .insert(tuple!("news", CONNECTIONS, "lots", "1"))
            .unwrap();

        let err = server.write_message("news", "m2").unwrap_err();
        assert!(matches!(err, ChatError::CorruptState { .. }));

        // The reclaimed slot is back and the new message was withdrawn.
        assert_eq!(space.count(&pattern!("news", MESSAGE, _, _)), 2);
        assert_eq!(
            space.try_peek(&pattern!("news", MESSAGE, "0", _)).unwrap(),
            Some(tuple!("news", MESSAGE, "0", "m0"))
        );
        assert_eq!(space.count(&pattern!("news", SIGNALS, "0", "0")), 1);
        assert_eq!(
            space.try_peek(&pattern!("news", NEXT_WRITE, _)).unwrap(),
            Some(tuple!("news", NEXT_WRITE, "2"))
        );

        // Once repaired, the channel accepts writes again.
        space.consume(&pattern!("news", CONNECTIONS, _, _)).unwrap();
        space.insert(tuple!("news", CONNECTIONS, "0", "1")).unwrap();
        server.write_message("news", "m2").unwrap();
        assert_eq!(space.count(&pattern!("news", MESSAGE, _, _)), 2);
        assert_eq!(space.try_peek(&pattern!("news", MESSAGE, "0", _)).unwrap(), None);
    }

    #[test]
    fn test_unknown_channel() {
        let server = server(2, &["news"]);
        assert!(matches!(
            server.write_message("weather", "rain"),
            Err(ChatError::UnknownChannel(_))
        ));
        assert!(matches!(
            server.open_connection("weather"),
            Err(ChatError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_attached_server_discovers_new_channels() {
        let first = server(2, &["news"]);
        let second = ChatServer::attach(first.space().clone()).unwrap();
        let _third = ChatServer::new(first.space().clone(), 4, &["sports"]).unwrap();

        assert_eq!(second.rows("sports").unwrap(), 4);
        assert_eq!(second.channels().unwrap(), vec!["news", "sports"]);
    }
}
