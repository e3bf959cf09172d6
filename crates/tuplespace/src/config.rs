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

//! TupleSpace Configuration Module
//!
//! ## Purpose
//! Selects wake routing, the optional re-poll safety net and metrics for a
//! [`TupleSpace`].
//!
//! ## Configuration Hierarchy
//! 1. **CODE**: Explicit `TupleSpaceConfig` in application code (highest priority)
//! 2. **ENV**: Environment variables (`LINDASPACES_WAKE_POLICY`, etc.)
//! 3. **FILE**: TOML/YAML/JSON configuration files
//! 4. **DEFAULT**: Broadcast wakes, no re-poll, metrics on (lowest priority)
//!
//! ## Examples
//!
//! ### From Code
//! ```rust
//! use lindaspaces_tuplespace::{TupleSpace, TupleSpaceConfig, WakePolicy};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TupleSpaceConfig {
//!     name: "chat".to_string(),
//!     wake_policy: WakePolicy::Single,
//!     recheck_interval_ms: 0,
//!     metrics_enabled: false,
//! };
//! let space = TupleSpace::from_config(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### From Environment Variables
//! ```bash
//! export LINDASPACES_WAKE_POLICY=single
//! export LINDASPACES_RECHECK_INTERVAL_MS=250
//! ```
//!
//! ### From Config File (TOML)
//! ```toml
//! name = "chat"
//! wake_policy = "single"
//! recheck_interval_ms = 250
//! metrics_enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{TupleSpace, TupleSpaceError, WakePolicy};

/// Environment variable naming the space
pub const ENV_NAME: &str = "LINDASPACES_TUPLESPACE_NAME";
/// Environment variable selecting the wake policy
pub const ENV_WAKE_POLICY: &str = "LINDASPACES_WAKE_POLICY";
/// Environment variable setting the re-poll interval in milliseconds
pub const ENV_RECHECK_INTERVAL_MS: &str = "LINDASPACES_RECHECK_INTERVAL_MS";
/// Environment variable toggling metrics
pub const ENV_METRICS_ENABLED: &str = "LINDASPACES_METRICS_ENABLED";

/// TupleSpace configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TupleSpaceConfig {
    /// Label used in logs and metrics
    pub name: String,
    /// How inserts wake blocked callers
    pub wake_policy: WakePolicy,
    /// Bounded re-poll for blocked callers; 0 disables it
    pub recheck_interval_ms: u64,
    /// Emit `metrics` counters and gauges
    pub metrics_enabled: bool,
}

impl Default for TupleSpaceConfig {
    fn default() -> Self {
        TupleSpaceConfig {
            name: "default".to_string(),
            wake_policy: WakePolicy::Broadcast,
            recheck_interval_ms: 0,
            metrics_enabled: true,
        }
    }
}

impl FromStr for WakePolicy {
    type Err = TupleSpaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broadcast" | "all" => Ok(WakePolicy::Broadcast),
            "single" | "one" => Ok(WakePolicy::Single),
            other => Err(TupleSpaceError::InvalidConfiguration(format!(
                "Unknown wake policy '{}'. Use 'broadcast' or 'single'",
                other
            ))),
        }
    }
}

impl TupleSpaceConfig {
    /// Re-poll interval, if enabled
    pub fn recheck_interval(&self) -> Option<Duration> {
        (self.recheck_interval_ms > 0).then(|| Duration::from_millis(self.recheck_interval_ms))
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), TupleSpaceError> {
        if self.name.trim().is_empty() {
            return Err(TupleSpaceError::InvalidConfiguration(
                "Tuple space name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Read configuration from the process environment
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, TupleSpaceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TupleSpaceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TupleSpaceConfig::default();

        if let Some(name) = lookup(ENV_NAME) {
            config.name = name;
        }
        if let Some(policy) = lookup(ENV_WAKE_POLICY) {
            config.wake_policy = policy.parse()?;
        }
        if let Some(interval) = lookup(ENV_RECHECK_INTERVAL_MS) {
            config.recheck_interval_ms = interval.trim().parse().map_err(|e| {
                TupleSpaceError::InvalidConfiguration(format!(
                    "{} must be a number of milliseconds: {}",
                    ENV_RECHECK_INTERVAL_MS, e
                ))
            })?;
        }
        if let Some(enabled) = lookup(ENV_METRICS_ENABLED) {
            config.metrics_enabled = match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(TupleSpaceError::InvalidConfiguration(format!(
                        "{} must be a boolean, got '{}'",
                        ENV_METRICS_ENABLED, other
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file; format is detected by extension
    /// (.toml, .yaml, .yml, .json)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TupleSpaceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TupleSpaceError::InvalidConfiguration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let config: TupleSpaceConfig = match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| {
                TupleSpaceError::InvalidConfiguration(format!("Failed to parse TOML config: {}", e))
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| {
                TupleSpaceError::InvalidConfiguration(format!("Failed to parse YAML config: {}", e))
            })?,
            "json" => serde_json::from_str(&content).map_err(|e| {
                TupleSpaceError::InvalidConfiguration(format!("Failed to parse JSON config: {}", e))
            })?,
            _ => {
                return Err(TupleSpaceError::InvalidConfiguration(format!(
                    "Unsupported config file format: {}. Use .toml, .yaml, .yml or .json",
                    path.display()
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }
}

impl TupleSpace {
    /// Create TupleSpace from explicit configuration (CODE - highest priority)
    pub fn from_config(config: TupleSpaceConfig) -> Result<Self, TupleSpaceError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Create TupleSpace from environment variables (ENV - medium priority)
    ///
    /// ## Environment Variables
    /// - `LINDASPACES_TUPLESPACE_NAME`: label for logs and metrics
    /// - `LINDASPACES_WAKE_POLICY`: "broadcast" or "single"
    /// - `LINDASPACES_RECHECK_INTERVAL_MS`: re-poll interval, 0 disables
    /// - `LINDASPACES_METRICS_ENABLED`: "true" or "false"
    pub fn from_env() -> Result<Self, TupleSpaceError> {
        Self::from_config(TupleSpaceConfig::from_env()?)
    }

    /// Create TupleSpace from configuration file (FILE - low priority)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TupleSpaceError> {
        Self::from_config(TupleSpaceConfig::from_file(path)?)
    }

    /// Create TupleSpace with smart defaults (Multi-source - fallback)
    ///
    /// Uses the environment when `LINDASPACES_WAKE_POLICY` is set, otherwise
    /// the default configuration.
    pub fn from_env_or_default() -> Result<Self, TupleSpaceError> {
        if std::env::var(ENV_WAKE_POLICY).is_ok() {
            Self::from_env()
        } else {
            Ok(Self::default())
        }
    }
}
