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

//! Hookflow hook pipeline engine.
//!
//! Hooks are independently written units of automation (validators,
//! notifiers, auditors) that attach declaratively to a small set of main
//! operations: parsing a source file, opening a model session, working with
//! git worktrees, and assembling model context. The engine runs them around
//! the operation in a deterministic order:
//!
//! - pre-phase hooks, sorted by priority (lower first, ties by registration);
//! - the main operation, through its external collaborator;
//! - post-phase hooks, seeing the operation's result.
//!
//! Each hook is gated on its dependencies and conditions, bounded by its own
//! timeout, and classified as required (failure aborts the run) or optional
//! (failure is recorded and isolated).
//!
//! # Example
//!
//! ```rust,ignore
//! use hookflow_core::{Collaborators, HookConfig, HookEngine, Operation, OperationKind};
//! use hookflow_core::hooks::CallbackHandler;
//!
//! let engine = HookEngine::with_collaborators(Collaborators::new().with_parser(parser));
//! engine.register_hook(
//!     "lint",
//!     CallbackHandler::new("lint", |_ctx| Ok(serde_json::json!({"ok": true}))),
//!     HookConfig::before(OperationKind::Parse).with_priority(10),
//! )?;
//!
//! let result = engine.execute_pipeline(Operation::parse("/src/app.js")).await;
//! assert!(result.success);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod operation;
pub mod pipeline;
pub mod statistics;

pub use config::{DuplicatePolicy, EngineConfig, HookManifestEntry};
pub use error::{CollaboratorError, ConfigError, DispatchError, HookError, PipelineError};
pub use events::{EngineEvent, EventBus};
pub use hooks::{
    Condition, ExecutionId, HookConfig, HookContext, HookExecutionRecord, HookHandler,
    HookPriority, HookStatus, HookTarget, Phase, SkipReason, Timing,
};
pub use operation::{Collaborators, Operation, OperationKind, OperationOutput, WorktreeAction};
pub use pipeline::{ActiveExecution, HookEngine, PipelineRequest, PipelineResult};
pub use statistics::{HookStatistics, StatisticsSnapshot};
