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


//! Chat listener: one connection reading a channel in order

use lindaspaces_tuplespace::{pattern, tuple, TupleSpace};

use crate::{parse_field, ChatError, ChatResult, CONNECTIONS, MESSAGE, SIGNALS};

/// Reads every message written to a channel since it connected
///
/// Each retained slot counts this listener as a pending reader until it has
/// been read, so writers never reclaim a slot the listener still owes.
/// Call [`ChatListener::close`] when done; dropping an open listener leaves
/// its pending reads outstanding and eventually stalls writers.
#[derive(Debug)]
pub struct ChatListener {
    space: TupleSpace,
    channel: String,
    rows: usize,
    next_read: u64,
}

impl ChatListener {
    pub(crate) fn new(space: TupleSpace, channel: String, rows: usize, next_read: u64) -> Self {
        ChatListener {
            space,
            channel,
            rows,
            next_read,
        }
    }

    /// Channel this listener reads
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// History size of the channel
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Position of the next message to read
    pub fn next_position(&self) -> u64 {
        self.next_read
    }

    /// Block until the next message is published and return its text
    pub fn next_message(&mut self) -> ChatResult<String> {
        let channel = self.channel.as_str();
        let slot = self.next_read.to_string();
        tracing::trace!(channel = %channel, slot = %slot, "Reading slot");

        let signal = self
            .space
            .consume(&pattern!(channel, SIGNALS, (slot.as_str()), _))?;
        let pending = match parse_field::<u64>(&signal, 3) {
            Ok(pending) if pending > 0 => pending,
            Ok(_) => {
                self.space.insert(signal)?;
                return Err(ChatError::CorruptState {
                    key: format!("{}/{}/{}", channel, SIGNALS, slot),
                    value: "0".to_string(),
                });
            }
            Err(err) => {
                self.space.insert(signal)?;
                return Err(err);
            }
        };

        let message = match self
            .space
            .peek(&pattern!(channel, MESSAGE, (slot.as_str()), _))
        {
            Ok(message) => message,
            Err(err) => {
                self.space.insert(signal)?;
                return Err(err.into());
            }
        };
        self.space.insert(tuple!(
            channel,
            SIGNALS,
            slot.as_str(),
            (pending - 1).to_string()
        ))?;

        self.next_read += 1;
        let text = message.into_fields().pop().unwrap_or_default();
        tracing::debug!(channel = %channel, slot = %slot, "Read message");
        Ok(text)
    }

    /// Read the messages this listener still owes, then disconnect
    pub fn close(mut self) -> ChatResult<()> {
        let connections = self
            .space
            .consume(&pattern!((self.channel.as_str()), CONNECTIONS, _, _))?;
        let parsed = parse_field::<u64>(&connections, 2).and_then(|listeners| {
            parse_field::<i64>(&connections, 3).map(|last| (listeners, last))
        });
        let (listeners, last_readable) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                self.space.insert(connections)?;
                return Err(err);
            }
        };

        while (self.next_read as i64) <= last_readable {
            if let Err(err) = self.next_message() {
                self.space.insert(connections)?;
                return Err(err);
            }
        }

        self.space.insert(tuple!(
            self.channel.as_str(),
            CONNECTIONS,
            listeners.saturating_sub(1).to_string(),
            last_readable.to_string()
        ))?;
        tracing::debug!(channel = %self.channel, "Closed connection");
        Ok(())
    }
}
