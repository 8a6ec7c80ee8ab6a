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

//! Pipeline coordinator.
//!
//! One call to [`HookEngine::execute_pipeline`] drives a run through
//!
//! ```text
//! start -> pre-phase chain -> main operation -> post-phase chain -> finalize
//! ```
//!
//! and always returns a [`PipelineResult`]. A required hook failing in
//! either phase, or the main operation failing, ends the run as failed with
//! every record captured up to that point.
//!
//! # Concurrency Model
//!
//! Runs share only the registry, the statistics and the event bus. Each run
//! owns its [`ExecutionContext`]; the engine tracks in-flight runs in a
//! sharded map keyed by [`ExecutionId`], and the entry is dropped when the
//! run finishes, fails, or its future is dropped.

use crate::config::EngineConfig;
use crate::error::{ConfigError, DispatchError, PipelineError};
use crate::events::{EngineEvent, EventBus};
use crate::hooks::{
    AsyncHookHandler, ChainExecutor, ExecutionContext, ExecutionId, HandlerCatalog, HookConfig,
    HookDefinition, HookExecutionRecord, HookHandler, HookRegistry, Phase, Timing,
};
use crate::operation::{
    Collaborators, Operation, OperationDispatcher, OperationKind, OperationOutput,
};
use crate::statistics::{EngineStatistics, StatisticsSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A request to run one pipeline.
///
/// In JSON the operation's fields sit at the top level next to `metadata`:
///
/// ```json
/// {"operation": "parse", "file_path": "/src/app.js", "metadata": {"task": "T-12"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    #[serde(flatten)]
    pub operation: Operation,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PipelineRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Parse a request, reporting an unrecognized operation kind as
    /// [`DispatchError::UnknownOperation`].
    pub fn from_json(json: &str) -> Result<Self, DispatchError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
        let kind = value
            .get("operation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DispatchError::InvalidRequest("missing operation".to_string()))?;
        kind.parse::<OperationKind>()?;
        serde_json::from_value(value).map_err(|e| DispatchError::InvalidRequest(e.to_string()))
    }
}

impl From<Operation> for PipelineRequest {
    fn from(operation: Operation) -> Self {
        Self::new(operation)
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub execution_id: ExecutionId,
    pub execution_time_us: u64,
    pub results: HashMap<String, serde_json::Value>,
    /// Every hook execution record, in execution order.
    pub hooks: Vec<HookExecutionRecord>,
    /// Main operation result, present once the operation has completed.
    pub output: Option<OperationOutput>,
    pub error: Option<String>,
}

impl PipelineResult {
    /// Record of the named hook, if it was considered in this run.
    pub fn hook(&self, name: &str) -> Option<&HookExecutionRecord> {
        self.hooks.iter().find(|r| r.hook_name == name)
    }

    pub fn records_for(&self, phase: Phase) -> impl Iterator<Item = &HookExecutionRecord> {
        self.hooks.iter().filter(move |r| r.phase == phase)
    }
}

/// An in-flight pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveExecution {
    pub execution_id: ExecutionId,
    pub operation: OperationKind,
    pub started_at: DateTime<Utc>,
}

/// Removes a run from the live table when dropped.
struct ExecutionGuard<'a> {
    executions: &'a DashMap<ExecutionId, ActiveExecution>,
    execution_id: ExecutionId,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.executions.remove(&self.execution_id);
    }
}

/// The hook pipeline engine.
///
/// Independent engines share nothing, so several can live in one process.
pub struct HookEngine {
    config: EngineConfig,
    registry: HookRegistry,
    dispatcher: OperationDispatcher,
    statistics: EngineStatistics,
    events: EventBus,
    executions: DashMap<ExecutionId, ActiveExecution>,
}

impl HookEngine {
    /// Create an engine. Hooks listed in `config.hooks` are not registered
    /// until [`HookEngine::load_hooks`] binds them to handlers.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, collaborators))
    }

    /// Create an engine with the default configuration.
    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self::build(EngineConfig::default(), collaborators)
    }

    fn build(config: EngineConfig, collaborators: Collaborators) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            registry: HookRegistry::new(config.duplicate_policy),
            dispatcher: OperationDispatcher::new(collaborators, events.clone()),
            statistics: EngineStatistics::new(),
            events,
            executions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a hook under `name`.
    pub fn register_hook(
        &self,
        name: impl Into<String>,
        handler: impl HookHandler + 'static,
        config: HookConfig,
    ) -> Result<(), ConfigError> {
        self.register_shared_hook(name, Arc::new(handler), config)
    }

    /// Register a hook whose handler is already shared.
    pub fn register_shared_hook(
        &self,
        name: impl Into<String>,
        handler: AsyncHookHandler,
        config: HookConfig,
    ) -> Result<(), ConfigError> {
        let hook = HookDefinition::new(name, handler, config, self.config.default_timeout())?;
        let event = EngineEvent::HookRegistered {
            hook_name: hook.name.clone(),
            timing: hook.timing,
            target: hook.target,
            priority: hook.priority.0,
        };
        tracing::info!(
            hook = %hook.name,
            timing = ?hook.timing,
            target = %hook.target,
            priority = hook.priority.0,
            required = hook.required,
            "Hook registered"
        );

        if self.registry.register(hook)?.is_some() {
            tracing::debug!("Previous hook definition replaced");
        }
        self.events.publish(event);
        Ok(())
    }

    /// Register every hook declared in the engine configuration, resolving
    /// handlers from `catalog`. Returns the number of hooks registered.
    ///
    /// Fails on the first entry whose handler is missing; entries before it
    /// stay registered.
    pub fn load_hooks(&self, catalog: &HandlerCatalog) -> Result<usize, ConfigError> {
        for entry in &self.config.hooks {
            let handler = catalog
                .get(&entry.handler)
                .ok_or_else(|| ConfigError::HandlerNotFound(entry.handler.clone()))?;
            self.register_shared_hook(entry.name.clone(), handler, entry.config.clone())?;
        }
        Ok(self.config.hooks.len())
    }

    /// Remove a hook. Returns true if it was registered.
    pub fn remove_hook(&self, name: &str) -> bool {
        match self.registry.remove(name) {
            Some(_) => {
                tracing::info!(hook = %name, "Hook removed");
                self.events.publish(EngineEvent::HookRemoved {
                    hook_name: name.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// Enable or disable a hook without removing it.
    pub fn set_hook_enabled(&self, name: &str, enabled: bool) -> bool {
        self.registry.set_enabled(name, enabled)
    }

    /// All registered hooks in registration order.
    pub fn hooks(&self) -> Vec<HookDefinition> {
        self.registry.list()
    }

    pub fn hook_count(&self) -> usize {
        self.registry.len()
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    pub fn active_executions(&self) -> Vec<ActiveExecution> {
        self.executions.iter().map(|e| e.value().clone()).collect()
    }

    /// Clear hooks, in-flight execution tracking and statistics.
    pub fn reset(&self) {
        self.registry.clear();
        self.executions.clear();
        self.statistics.reset();
        tracing::info!("Hook engine reset");
    }

    /// Run one pipeline to completion.
    pub async fn execute_pipeline(&self, request: impl Into<PipelineRequest>) -> PipelineResult {
        let request = request.into();
        let mut context = ExecutionContext::new(request.operation, request.metadata);
        let execution_id = context.execution_id;
        let kind = context.kind();

        self.executions.insert(
            execution_id,
            ActiveExecution {
                execution_id,
                operation: kind,
                started_at: Utc::now(),
            },
        );
        let _guard = ExecutionGuard {
            executions: &self.executions,
            execution_id,
        };

        self.statistics.pipeline_started();
        self.events.publish(EngineEvent::PipelineStarted {
            execution_id,
            operation: context.operation.clone(),
        });
        tracing::debug!(execution_id = %execution_id, operation = %kind, "Pipeline started");

        let mut output = None;
        let outcome = self.run_phases(&mut context, &mut output).await;
        let execution_time_us = context.elapsed_us();

        match outcome {
            Ok(()) => {
                self.statistics.pipeline_succeeded(execution_time_us);
                self.events.publish(EngineEvent::PipelineCompleted {
                    execution_id,
                    execution_time_us,
                    results: context.results.clone(),
                });
                tracing::debug!(
                    execution_id = %execution_id,
                    operation = %kind,
                    execution_time_us,
                    hooks = context.records.len(),
                    "Pipeline completed"
                );

                PipelineResult {
                    success: true,
                    execution_id,
                    execution_time_us,
                    results: context.results,
                    hooks: context.records,
                    output,
                    error: None,
                }
            }
            Err(error) => {
                let message = error.to_string();
                self.statistics.pipeline_failed();
                self.events.publish(EngineEvent::PipelineError {
                    execution_id,
                    error: message.clone(),
                });
                tracing::warn!(
                    execution_id = %execution_id,
                    operation = %kind,
                    error = %message,
                    "Pipeline failed"
                );

                PipelineResult {
                    success: false,
                    execution_id,
                    execution_time_us,
                    results: context.results,
                    hooks: context.records,
                    output,
                    error: Some(message),
                }
            }
        }
    }

    async fn run_phases(
        &self,
        context: &mut ExecutionContext,
        output: &mut Option<OperationOutput>,
    ) -> Result<(), PipelineError> {
        let chain = ChainExecutor::new(&self.statistics, &self.events);
        let kind = context.kind();

        let pre_hooks = self.registry.hooks_for(Timing::Before, kind);
        chain.run_chain(context, &pre_hooks, Phase::Pre, None).await?;

        let result = self.dispatcher.dispatch(context).await?;
        let previous = result.to_value();
        *output = Some(result);

        let post_hooks = self.registry.hooks_for(Timing::After, kind);
        chain
            .run_chain(context, &post_hooks, Phase::Post, Some(previous))
            .await
    }
}

impl std::fmt::Debug for HookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEngine")
            .field("config", &self.config)
            .field("hooks", &self.registry.len())
            .field("active_executions", &self.executions.len())
            .field("collaborators", self.dispatcher.collaborators())
            .finish()
    }
}
