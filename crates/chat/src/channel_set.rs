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


//! Channel set: the registry of channels and their history sizes
//!
//! Stored in the space as a single `("chs", <encoded>)` tuple. The encoding is
//! `name:rows, ` repeated, so a name may not be empty or contain `:` or `,`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{ChatError, ChatResult};

/// Channel names mapped to the number of messages each one retains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet {
    channels: BTreeMap<String, usize>,
}

/// Reject names that would break the channel set encoding
pub fn validate_channel_name(name: &str) -> ChatResult<()> {
    if name.is_empty() || name.contains(':') || name.contains(',') {
        return Err(ChatError::InvalidChannelName(name.to_string()));
    }
    Ok(())
}

impl ChannelSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `rows` of history
    ///
    /// Returns `Ok(true)` when the channel is new and `Ok(false)` when it was
    /// already registered with the same size.
    pub fn add(&mut self, name: &str, rows: usize) -> ChatResult<bool> {
        validate_channel_name(name)?;
        if rows == 0 {
            return Err(ChatError::InvalidRows {
                channel: name.to_string(),
                rows,
            });
        }
        match self.channels.get(name) {
            Some(&existing) if existing != rows => Err(ChatError::RowsMismatch {
                channel: name.to_string(),
                existing,
                requested: rows,
            }),
            Some(_) => Ok(false),
            None => {
                self.channels.insert(name.to_string(), rows);
                Ok(true)
            }
        }
    }

    /// Add channels from `other` that are not known here
    ///
    /// Returns the names that were added. A channel known to both with
    /// different sizes keeps the local size.
    pub fn merge(&mut self, other: &ChannelSet) -> Vec<String> {
        let mut added = Vec::new();
        for (name, &rows) in &other.channels {
            match self.channels.get(name) {
                Some(&existing) if existing != rows => {
                    tracing::warn!(
                        channel = %name,
                        existing,
                        other = rows,
                        "Channel registered with different rows, keeping local size"
                    );
                }
                Some(_) => {}
                None => {
                    self.channels.insert(name.clone(), rows);
                    added.push(name.clone());
                }
            }
        }
        added
    }

    /// Rows retained by `name`
    pub fn rows(&self, name: &str) -> Option<usize> {
        self.channels.get(name).copied()
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Registered channel names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when no channel is registered
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, rows) in &self.channels {
            write!(f, "{}:{}, ", name, rows)?;
        }
        Ok(())
    }
}

impl FromStr for ChannelSet {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let corrupt = || ChatError::CorruptState {
            key: crate::CHANNEL_SET.to_string(),
            value: s.to_string(),
        };

        let mut set = ChannelSet::new();
        for item in s.split(", ").filter(|item| !item.is_empty()) {
            let (name, rows) = item.split_once(':').ok_or_else(corrupt)?;
            let rows = rows.parse::<usize>().map_err(|_| corrupt())?;
            validate_channel_name(name).map_err(|_| corrupt())?;
            set.channels.insert(name.to_string(), rows);
        }
        Ok(set)
    }
}
