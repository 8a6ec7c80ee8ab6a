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

//! Interfaces of the external collaborators behind each main operation.
//!
//! The engine only needs these narrow capabilities; parsing, model transport
//! and git mechanics live elsewhere.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options forwarded to the structural parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Language override; detected from the extension when absent.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub include_comments: bool,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// A named symbol found in a parsed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: String,
    pub line: usize,
}

/// Structural representation of a parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralData {
    pub file_path: PathBuf,
    pub language: Option<String>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Parser-specific tree representation.
    #[serde(default)]
    pub tree: serde_json::Value,
}

/// Context assembled for a model from a set of files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextData {
    pub task: String,
    pub files: Vec<PathBuf>,
    pub content: String,
    pub token_estimate: Option<usize>,
}

/// Settings for opening a model session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// An open model session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// A git worktree discovered under a repository path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
    #[serde(default)]
    pub is_main: bool,
}

/// Handle to an active file watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHandle {
    pub path: PathBuf,
    pub watch_id: String,
}

/// Snapshot of a worktree's working state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeState {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
    #[serde(default)]
    pub modified_files: Vec<PathBuf>,
    #[serde(default)]
    pub untracked_files: Vec<PathBuf>,
}

impl WorktreeState {
    pub fn is_clean(&self) -> bool {
        self.modified_files.is_empty() && self.untracked_files.is_empty()
    }
}

#[async_trait]
pub trait StructuralParser: Send + Sync {
    async fn parse_file(
        &self,
        path: &Path,
        options: &ParseOptions,
    ) -> Result<StructuralData, CollaboratorError>;

    async fn generate_context(
        &self,
        files: &[PathBuf],
        task: &str,
    ) -> Result<ContextData, CollaboratorError>;
}

#[async_trait]
pub trait ModelSessionService: Send + Sync {
    async fn create_session(&self, config: &SessionConfig) -> Result<Session, CollaboratorError>;

    async fn process_context(
        &self,
        session: &Session,
        prompt: &str,
    ) -> Result<ModelResponse, CollaboratorError>;
}

#[async_trait]
pub trait WorktreeManager: Send + Sync {
    async fn discover_worktrees(&self, path: &Path) -> Result<Vec<WorktreeInfo>, CollaboratorError>;

    async fn watch_files(&self, path: &Path) -> Result<WatchHandle, CollaboratorError>;

    async fn get_worktree_state(&self, path: &Path) -> Result<WorktreeState, CollaboratorError>;
}

/// The set of collaborators available to the dispatcher.
///
/// Any of them may be absent; an operation whose collaborator is missing
/// fails at dispatch time.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub parser: Option<Arc<dyn StructuralParser>>,
    pub sessions: Option<Arc<dyn ModelSessionService>>,
    pub worktrees: Option<Arc<dyn WorktreeManager>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, parser: Arc<dyn StructuralParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn ModelSessionService>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_worktrees(mut self, worktrees: Arc<dyn WorktreeManager>) -> Self {
        self.worktrees = Some(worktrees);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("parser", &self.parser.is_some())
            .field("sessions", &self.sessions.is_some())
            .field("worktrees", &self.worktrees.is_some())
            .finish()
    }
}
