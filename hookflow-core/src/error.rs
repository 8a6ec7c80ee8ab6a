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

//! Error types for the hook engine.
//!
//! Errors are split by where they originate: configuration mistakes are
//! caught at registration time, hook failures are classified per hook, and
//! dispatch failures come from the main operation. Only [`PipelineError`]
//! aborts a run, and it never escapes [`crate::HookEngine::execute_pipeline`].

use crate::hooks::Phase;
use crate::operation::OperationKind;
use thiserror::Error;

/// Structural errors in hook or engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Hook name cannot be empty")]
    EmptyHookName,

    #[error("Hook {0} must have a timeout greater than zero")]
    ZeroTimeout(String),

    #[error("Hook {0} declares an empty dependency name")]
    EmptyDependency(String),

    #[error("Hook {0} cannot depend on itself")]
    SelfDependency(String),

    #[error("Hook already registered: {0}")]
    DuplicateHook(String),

    #[error("Hook handler not found in catalog: {0}")]
    HandlerNotFound(String),

    #[error("Invalid hook at index {index}: {reason}")]
    InvalidHook { index: usize, reason: String },

    #[error("Invalid engine setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of a single hook execution.
#[derive(Debug, Clone, Error)]
pub enum HookError {
    #[error("Hook execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Hook {name} timeout")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Hook {0} panicked")]
    Panicked(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl HookError {
    /// Shorthand for a handler-reported failure.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::ExecutionFailed(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HookError::Timeout { .. })
    }
}

impl From<serde_json::Error> for HookError {
    fn from(e: serde_json::Error) -> Self {
        HookError::SerializationError(e.to_string())
    }
}

/// Error reported by an external collaborator (parser, model session
/// service, worktree manager).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0}")]
    Failed(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures of the main-operation dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid pipeline request: {0}")]
    InvalidRequest(String),

    #[error("No collaborator configured for operation {0}")]
    CollaboratorUnavailable(OperationKind),

    #[error("Operation {kind} failed: {source}")]
    Collaborator {
        kind: OperationKind,
        #[source]
        source: CollaboratorError,
    },
}

/// An error that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Required hook {hook} failed during {phase} phase: {source}")]
    RequiredHookFailed {
        hook: String,
        phase: Phase,
        #[source]
        source: HookError,
    },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
