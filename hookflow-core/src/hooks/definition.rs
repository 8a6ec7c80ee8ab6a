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

//! Hook definitions and their registration-time configuration.

use super::context::ExecutionContext;
use super::handlers::AsyncHookHandler;
use crate::error::{ConfigError, DispatchError};
use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timeout applied when a hook does not configure one.
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 10_000;

/// When a hook runs relative to the main operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    #[default]
    Before,
    After,
}

impl Timing {
    pub fn phase(&self) -> Phase {
        match self {
            Timing::Before => Phase::Pre,
            Timing::After => Phase::Post,
        }
    }
}

/// Phase of a pipeline run a hook executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pre,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pre => f.write_str("pre"),
            Phase::Post => f.write_str("post"),
        }
    }
}

/// Operation a hook attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HookTarget {
    /// Runs around every operation.
    #[default]
    Any,
    Operation(OperationKind),
}

impl HookTarget {
    pub fn matches(&self, kind: OperationKind) -> bool {
        match self {
            HookTarget::Any => true,
            HookTarget::Operation(target) => *target == kind,
        }
    }
}

impl From<OperationKind> for HookTarget {
    fn from(kind: OperationKind) -> Self {
        HookTarget::Operation(kind)
    }
}

impl TryFrom<String> for HookTarget {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "any" || value == "*" {
            return Ok(HookTarget::Any);
        }
        value.parse().map(HookTarget::Operation)
    }
}

impl From<HookTarget> for String {
    fn from(target: HookTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Any => f.write_str("any"),
            HookTarget::Operation(kind) => write!(f, "{}", kind),
        }
    }
}

/// Priority level for hook execution.
/// Lower values execute first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookPriority(pub i32);

impl Default for HookPriority {
    fn default() -> Self {
        HookPriority(100)
    }
}

impl HookPriority {
    /// Highest priority (executes first).
    pub const HIGHEST: HookPriority = HookPriority(0);
    /// High priority.
    pub const HIGH: HookPriority = HookPriority(25);
    /// Normal priority.
    pub const NORMAL: HookPriority = HookPriority(50);
    /// Low priority.
    pub const LOW: HookPriority = HookPriority(75);
    /// Lowest priority (executes last).
    pub const LOWEST: HookPriority = HookPriority(100);
}

impl From<i32> for HookPriority {
    fn from(value: i32) -> Self {
        HookPriority(value)
    }
}

/// A predicate that must hold for a hook to run.
///
/// Serialized as a `{"type": ..., "value": ...}` pair. Types the engine does
/// not know are kept as [`Condition::Unrecognized`] and always pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    /// The operation's file path contains the given substring.
    FileExists(String),
    /// A parse in this run produced structural data.
    HasAstData,
    /// A model session is open in this run.
    HasModelSession,
    Unrecognized {
        kind: String,
        value: serde_json::Value,
    },
}

impl Condition {
    pub fn file_exists(needle: impl Into<String>) -> Self {
        Condition::FileExists(needle.into())
    }

    pub fn evaluate(&self, context: &ExecutionContext) -> bool {
        match self {
            Condition::FileExists(needle) => context.operation.path_contains(needle),
            Condition::HasAstData => context.ast_data.is_some(),
            Condition::HasModelSession => context.session.is_some(),
            Condition::Unrecognized { .. } => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCondition {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        match raw.kind.as_str() {
            "fileExists" | "file_exists" => Condition::FileExists(match raw.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            "hasASTData" | "has_ast_data" => Condition::HasAstData,
            "hasClaudeSession" | "has_model_session" => Condition::HasModelSession,
            _ => Condition::Unrecognized {
                kind: raw.kind,
                value: raw.value,
            },
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let (kind, value) = match condition {
            Condition::FileExists(needle) => {
                ("fileExists".to_string(), serde_json::Value::String(needle))
            }
            Condition::HasAstData => ("hasASTData".to_string(), serde_json::Value::Bool(true)),
            Condition::HasModelSession => {
                ("hasClaudeSession".to_string(), serde_json::Value::Bool(true))
            }
            Condition::Unrecognized { kind, value } => (kind, value),
        };
        RawCondition { kind, value }
    }
}

fn default_required() -> bool {
    true
}

fn default_enabled() -> bool {
    true
}

/// Registration settings for a hook. Every field has a documented default:
///
/// | field          | default        |
/// |----------------|----------------|
/// | `timing`       | `before`       |
/// | `target`       | `any`          |
/// | `priority`     | `100`          |
/// | `required`     | `true`         |
/// | `timeout_ms`   | engine default (10000) |
/// | `dependencies` | none           |
/// | `conditions`   | none           |
/// | `enabled`      | `true`         |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub target: HookTarget,
    #[serde(default)]
    pub priority: HookPriority,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            target: HookTarget::default(),
            priority: HookPriority::default(),
            required: default_required(),
            timeout_ms: None,
            dependencies: Vec::new(),
            conditions: Vec::new(),
            enabled: default_enabled(),
            description: None,
        }
    }
}

impl HookConfig {
    /// A pre-phase hook for `target`.
    pub fn before(target: impl Into<HookTarget>) -> Self {
        Self {
            timing: Timing::Before,
            target: target.into(),
            ..Default::default()
        }
    }

    /// A post-phase hook for `target`.
    pub fn after(target: impl Into<HookTarget>) -> Self {
        Self {
            timing: Timing::After,
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: impl Into<HookPriority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Failures of this hook are recorded but do not abort the pipeline.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn depends_on(mut self, hook_name: impl Into<String>) -> Self {
        self.dependencies.push(hook_name.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate this configuration for a hook called `name`.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyHookName);
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout(name.to_string()));
        }
        for dependency in &self.dependencies {
            if dependency.trim().is_empty() {
                return Err(ConfigError::EmptyDependency(name.to_string()));
            }
            if dependency == name {
                return Err(ConfigError::SelfDependency(name.to_string()));
            }
        }
        Ok(())
    }
}

/// A registered hook: its handler plus validated settings.
#[derive(Clone)]
pub struct HookDefinition {
    pub name: String,
    pub handler: AsyncHookHandler,
    pub timing: Timing,
    pub target: HookTarget,
    pub priority: HookPriority,
    pub required: bool,
    pub timeout: Duration,
    pub dependencies: Vec<String>,
    pub conditions: Vec<Condition>,
    pub enabled: bool,
    pub description: Option<String>,
    /// Registration order, used to keep equal priorities stable.
    pub(crate) sequence: u64,
}

impl HookDefinition {
    /// Build a definition, validating `config` and filling in the default
    /// timeout.
    pub fn new(
        name: impl Into<String>,
        handler: AsyncHookHandler,
        config: HookConfig,
        default_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        config.validate(&name)?;

        Ok(Self {
            timeout: config
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default_timeout),
            name,
            handler,
            timing: config.timing,
            target: config.target,
            priority: config.priority,
            required: config.required,
            dependencies: config.dependencies,
            conditions: config.conditions,
            enabled: config.enabled,
            description: config.description,
            sequence: 0,
        })
    }

    pub fn applies_to(&self, timing: Timing, kind: OperationKind) -> bool {
        self.enabled && self.timing == timing && self.target.matches(kind)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("name", &self.name)
            .field("handler", &self.handler.name())
            .field("timing", &self.timing)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("required", &self.required)
            .field("timeout", &self.timeout)
            .field("dependencies", &self.dependencies)
            .field("conditions", &self.conditions)
            .field("enabled", &self.enabled)
            .finish()
    }
}
