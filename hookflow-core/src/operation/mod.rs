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

//! Main operations the engine wraps with hooks.
//!
//! The set of operations is closed: each variant of [`Operation`] carries its
//! own typed payload and the dispatcher matches on it exhaustively, so adding
//! an operation kind is a compile-time change rather than a new string key.

mod collaborators;
mod dispatcher;

pub use collaborators::{
    Collaborators, ContextData, ModelResponse, ModelSessionService, ParseOptions, Session,
    SessionConfig, StructuralData, StructuralParser, Symbol, WatchHandle, WorktreeInfo,
    WorktreeManager, WorktreeState,
};
pub use dispatcher::OperationDispatcher;

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Discriminant of an [`Operation`], used as a hook target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Parse a source file into structural data.
    Parse,
    /// Open a model session and optionally run a prompt through it.
    #[serde(alias = "session")]
    ModelSession,
    /// Inspect or watch git worktrees.
    Worktree,
    /// Assemble model context from a set of files.
    #[serde(alias = "context")]
    ContextAssembly,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Parse,
        OperationKind::ModelSession,
        OperationKind::Worktree,
        OperationKind::ContextAssembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Parse => "parse",
            OperationKind::ModelSession => "model_session",
            OperationKind::Worktree => "worktree",
            OperationKind::ContextAssembly => "context_assembly",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parse" => Ok(OperationKind::Parse),
            "model_session" | "session" => Ok(OperationKind::ModelSession),
            "worktree" => Ok(OperationKind::Worktree),
            "context_assembly" | "context" => Ok(OperationKind::ContextAssembly),
            other => Err(DispatchError::UnknownOperation(other.to_string())),
        }
    }
}

/// What a worktree operation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeAction {
    Discover,
    Watch,
    State,
}

/// A main operation request with its typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Parse {
        file_path: PathBuf,
        #[serde(default)]
        options: ParseOptions,
    },
    #[serde(alias = "session")]
    ModelSession {
        #[serde(default)]
        config: SessionConfig,
        #[serde(default)]
        prompt: Option<String>,
    },
    Worktree {
        path: PathBuf,
        action: WorktreeAction,
    },
    #[serde(alias = "context")]
    ContextAssembly {
        files: Vec<PathBuf>,
        task: String,
    },
}

impl Operation {
    pub fn parse(file_path: impl Into<PathBuf>) -> Self {
        Operation::Parse {
            file_path: file_path.into(),
            options: ParseOptions::default(),
        }
    }

    pub fn model_session(config: SessionConfig, prompt: Option<String>) -> Self {
        Operation::ModelSession { config, prompt }
    }

    pub fn worktree(path: impl Into<PathBuf>, action: WorktreeAction) -> Self {
        Operation::Worktree {
            path: path.into(),
            action,
        }
    }

    pub fn context_assembly(files: Vec<PathBuf>, task: impl Into<String>) -> Self {
        Operation::ContextAssembly {
            files,
            task: task.into(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Parse { .. } => OperationKind::Parse,
            Operation::ModelSession { .. } => OperationKind::ModelSession,
            Operation::Worktree { .. } => OperationKind::Worktree,
            Operation::ContextAssembly { .. } => OperationKind::ContextAssembly,
        }
    }

    /// Paths this operation works on, used by `fileExists` conditions.
    pub fn file_paths(&self) -> Vec<&Path> {
        match self {
            Operation::Parse { file_path, .. } => vec![file_path.as_path()],
            Operation::Worktree { path, .. } => vec![path.as_path()],
            Operation::ContextAssembly { files, .. } => files.iter().map(|p| p.as_path()).collect(),
            Operation::ModelSession { config, .. } => {
                config.working_directory.iter().map(|p| p.as_path()).collect()
            }
        }
    }

    /// True when any of the operation's paths contains `needle`.
    pub fn path_contains(&self, needle: &str) -> bool {
        self.file_paths()
            .iter()
            .any(|p| p.to_string_lossy().contains(needle))
    }
}

/// Typed result of a main operation, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutput {
    Parse {
        data: StructuralData,
    },
    ModelSession {
        session: Session,
        response: Option<ModelResponse>,
    },
    Worktree {
        action: WorktreeAction,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        worktrees: Vec<WorktreeInfo>,
        watch: Option<WatchHandle>,
        state: Option<WorktreeState>,
    },
    ContextAssembly {
        context: ContextData,
    },
}

impl OperationOutput {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationOutput::Parse { .. } => OperationKind::Parse,
            OperationOutput::ModelSession { .. } => OperationKind::ModelSession,
            OperationOutput::Worktree { .. } => OperationKind::Worktree,
            OperationOutput::ContextAssembly { .. } => OperationKind::ContextAssembly,
        }
    }

    /// JSON form handed to post-phase hooks as their previous result.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
