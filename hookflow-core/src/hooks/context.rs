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

//! Per-run execution state and the view of it handed to hook handlers.

use super::definition::Phase;
use super::record::HookExecutionRecord;
use crate::operation::{Operation, OperationKind, Session, StructuralData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Opaque identifier of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        ExecutionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable state of a single pipeline run.
///
/// Owned by the run that created it; the chain executor and dispatcher
/// mutate it in turn, never concurrently.
#[derive(Debug)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub operation: Operation,
    /// Caller-supplied request metadata.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Hook name to produced value.
    pub results: HashMap<String, serde_json::Value>,
    pub records: Vec<HookExecutionRecord>,
    /// Set after a parse operation.
    pub ast_data: Option<Arc<StructuralData>>,
    /// Set after a model-session operation.
    pub session: Option<Arc<Session>>,
    pub started_at: Instant,
}

impl ExecutionContext {
    pub fn new(operation: Operation, metadata: HashMap<String, serde_json::Value>) -> Self {
        Self {
            execution_id: ExecutionId::new(),
            operation,
            metadata,
            results: HashMap::new(),
            records: Vec::new(),
            ast_data: None,
            session: None,
            started_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// True when `hook_name` already produced a non-null result in this run.
    pub fn has_result(&self, hook_name: &str) -> bool {
        self.results
            .get(hook_name)
            .map(|value| !value.is_null())
            .unwrap_or(false)
    }

    pub fn elapsed_us(&self) -> u64 {
        self.started_at.elapsed().as_micros() as u64
    }

    /// Build the view a hook handler receives.
    pub fn hook_context(
        &self,
        hook_name: &str,
        phase: Phase,
        previous_result: Option<serde_json::Value>,
    ) -> HookContext {
        HookContext {
            execution_id: self.execution_id,
            hook_name: hook_name.to_string(),
            phase,
            target: self.kind(),
            operation: self.operation.clone(),
            previous_result,
            results: self.results.clone(),
            ast_data: self.ast_data.clone(),
            session: self.session.clone(),
            metadata: self.metadata.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// What a hook handler sees when it runs.
///
/// `results` is a snapshot taken right before the handler starts. Hooks in
/// a phase run one at a time, so it holds everything produced so far.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub execution_id: ExecutionId,
    pub hook_name: String,
    pub phase: Phase,
    pub target: OperationKind,
    pub operation: Operation,
    /// Result of the previous successful hook, or of the main operation for
    /// the first post-phase hook.
    pub previous_result: Option<serde_json::Value>,
    pub results: HashMap<String, serde_json::Value>,
    pub ast_data: Option<Arc<StructuralData>>,
    pub session: Option<Arc<Session>>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl HookContext {
    /// Result produced earlier in this run by `hook_name`.
    pub fn result(&self, hook_name: &str) -> Option<&serde_json::Value> {
        self.results.get(hook_name)
    }

    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}
