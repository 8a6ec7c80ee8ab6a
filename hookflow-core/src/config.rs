// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration.
//!
//! # Example JSON Configuration
//!
//! ```json
//! {
//!     "default_timeout_ms": 5000,
//!     "duplicate_policy": "reject",
//!     "hooks": [
//!         {"name": "lint", "handler": "eslint", "target": "parse", "priority": 10},
//!         {"name": "notify", "handler": "slack", "timing": "after", "required": false}
//!     ]
//! }
//! ```
//!
//! Settings can be overridden from the environment with
//! `HOOKFLOW_DEFAULT_TIMEOUT_MS`, `HOOKFLOW_DUPLICATE_POLICY` and
//! `HOOKFLOW_EVENT_CAPACITY`.

use crate::error::ConfigError;
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::hooks::{HookConfig, DEFAULT_HOOK_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DEFAULT_TIMEOUT_MS: &str = "HOOKFLOW_DEFAULT_TIMEOUT_MS";
pub const ENV_DUPLICATE_POLICY: &str = "HOOKFLOW_DUPLICATE_POLICY";
pub const ENV_EVENT_CAPACITY: &str = "HOOKFLOW_EVENT_CAPACITY";

/// What registering an already-registered hook name does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The new definition replaces the old one.
    #[default]
    Replace,
    /// Registration fails with [`ConfigError::DuplicateHook`].
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(DuplicatePolicy::Replace),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(ConfigError::InvalidSetting {
                key: "duplicate_policy",
                reason: format!("expected replace or reject, got {}", other),
            }),
        }
    }
}

/// A hook declared in configuration, bound to a handler by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookManifestEntry {
    pub name: String,
    /// Name of the handler in the [`crate::hooks::HandlerCatalog`].
    pub handler: String,
    #[serde(flatten)]
    pub config: HookConfig,
}

impl HookManifestEntry {
    pub fn new(name: impl Into<String>, handler: impl Into<String>, config: HookConfig) -> Self {
        Self {
            name: name.into(),
            handler: handler.into(),
            config,
        }
    }
}

/// Configuration for a [`crate::HookEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for hooks that do not set their own, in milliseconds.
    #[serde(default = "default_timeout")]
    pub default_timeout_ms: u64,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Capacity of the event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Hooks to register from configuration.
    #[serde(default)]
    pub hooks: Vec<HookManifestEntry>,
}

fn default_timeout() -> u64 {
    DEFAULT_HOOK_TIMEOUT_MS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout(),
            duplicate_policy: DuplicatePolicy::default(),
            event_capacity: default_event_capacity(),
            hooks: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load a configuration file; `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents)?,
            _ => Self::from_json(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `HOOKFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `HOOKFLOW_*` names.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEFAULT_TIMEOUT_MS) {
            self.default_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidSetting {
                        key: "default_timeout_ms",
                        reason: e.to_string(),
                    })?;
        }
        if let Some(value) = lookup(ENV_DUPLICATE_POLICY) {
            self.duplicate_policy = value.parse()?;
        }
        if let Some(value) = lookup(ENV_EVENT_CAPACITY) {
            self.event_capacity =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidSetting {
                        key: "event_capacity",
                        reason: e.to_string(),
                    })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "default_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "event_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (index, entry) in self.hooks.iter().enumerate() {
            let invalid = |reason: String| ConfigError::InvalidHook { index, reason };
            if entry.handler.trim().is_empty() {
                return Err(invalid("handler name cannot be empty".to_string()));
            }
            entry
                .config
                .validate(&entry.name)
                .map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}
