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

//! Hook chain executor.
//!
//! Runs an already-ordered list of hooks against a run's context, one at a
//! time. Each hook passes through two gates before it executes:
//!
//! 1. dependencies: every named hook must already have a non-null result;
//! 2. conditions: every predicate must hold against the context.
//!
//! A hook that fails a gate is recorded as skipped and never invoked; a hook
//! skipped for dependencies is not evaluated for conditions. Execution is
//! bounded by the hook's own timeout. Failures of optional hooks are
//! recorded and swallowed, failures of required hooks abort the chain.

use super::context::{ExecutionContext, HookContext};
use super::definition::{HookDefinition, Phase};
use super::record::{HookExecutionRecord, SkipReason};
use crate::error::{HookError, PipelineError};
use crate::events::{EngineEvent, EventBus};
use crate::statistics::EngineStatistics;
use serde_json::Value;
use std::time::Instant;

pub struct ChainExecutor<'a> {
    statistics: &'a EngineStatistics,
    events: &'a EventBus,
}

impl<'a> ChainExecutor<'a> {
    pub fn new(statistics: &'a EngineStatistics, events: &'a EventBus) -> Self {
        Self { statistics, events }
    }

    /// Run `hooks` in order.
    ///
    /// `previous_result` is what the first hook sees as its previous result;
    /// each successful hook's value becomes the previous result of the next.
    pub async fn run_chain(
        &self,
        context: &mut ExecutionContext,
        hooks: &[HookDefinition],
        phase: Phase,
        previous_result: Option<Value>,
    ) -> Result<(), PipelineError> {
        let mut previous = previous_result;

        for hook in hooks {
            if let Some(reason) = gate(context, hook) {
                tracing::debug!(
                    execution_id = %context.execution_id,
                    hook = %hook.name,
                    phase = %phase,
                    reason = %reason,
                    "Hook skipped"
                );
                context
                    .records
                    .push(HookExecutionRecord::skipped(&hook.name, phase, reason));
                self.events.publish(EngineEvent::HookSkipped {
                    execution_id: context.execution_id,
                    hook_name: hook.name.clone(),
                    phase,
                    reason,
                });
                continue;
            }

            self.events.publish(EngineEvent::HookStarted {
                execution_id: context.execution_id,
                hook_name: hook.name.clone(),
                phase,
            });

            let hook_context = context.hook_context(&hook.name, phase, previous.clone());
            let start = Instant::now();
            let outcome = execute_with_timeout(hook, &hook_context).await;
            let execution_time_us = start.elapsed().as_micros() as u64;

            match outcome {
                Ok(value) => {
                    context.results.insert(hook.name.clone(), value.clone());
                    context.records.push(HookExecutionRecord::success(
                        &hook.name,
                        phase,
                        value.clone(),
                        execution_time_us,
                    ));
                    self.statistics.hook_succeeded(&hook.name, execution_time_us);
                    self.events.publish(EngineEvent::HookCompleted {
                        execution_id: context.execution_id,
                        hook_name: hook.name.clone(),
                        phase,
                        result: value.clone(),
                        execution_time_us,
                    });
                    tracing::debug!(
                        execution_id = %context.execution_id,
                        hook = %hook.name,
                        phase = %phase,
                        execution_time_us,
                        "Hook completed"
                    );
                    previous = Some(value);
                }
                Err(error) => {
                    let message = error.to_string();
                    context.records.push(HookExecutionRecord::error(
                        &hook.name,
                        phase,
                        message.clone(),
                        execution_time_us,
                    ));
                    self.statistics.hook_failed(&hook.name, execution_time_us);
                    self.events.publish(EngineEvent::HookError {
                        execution_id: context.execution_id,
                        hook_name: hook.name.clone(),
                        phase,
                        error: message.clone(),
                    });
                    tracing::warn!(
                        execution_id = %context.execution_id,
                        hook = %hook.name,
                        phase = %phase,
                        required = hook.required,
                        error = %message,
                        "Hook failed"
                    );

                    if hook.required {
                        return Err(PipelineError::RequiredHookFailed {
                            hook: hook.name.clone(),
                            phase,
                            source: error,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Dependency gate first, then condition gate.
fn gate(context: &ExecutionContext, hook: &HookDefinition) -> Option<SkipReason> {
    if !hook.dependencies.iter().all(|dep| context.has_result(dep)) {
        return Some(SkipReason::DependenciesNotMet);
    }
    if !hook.conditions.iter().all(|c| c.evaluate(context)) {
        return Some(SkipReason::ConditionsNotMet);
    }
    None
}

/// Run the handler on its own task and race it against the hook's timeout.
///
/// A panicking handler is reported as [`HookError::Panicked`]. On expiry the
/// task is aborted, which takes effect at its next suspension point.
async fn execute_with_timeout(
    hook: &HookDefinition,
    context: &HookContext,
) -> Result<Value, HookError> {
    let handler = hook.handler.clone();
    let context = context.clone();
    let mut task = tokio::spawn(async move { handler.handle(&context).await });

    match tokio::time::timeout(hook.timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) if join_err.is_panic() => {
            Err(HookError::Panicked(hook.name.clone()))
        }
        Ok(Err(join_err)) => Err(HookError::failed(join_err.to_string())),
        Err(_) => {
            task.abort();
            Err(HookError::Timeout {
                name: hook.name.clone(),
                timeout_ms: hook.timeout_ms(),
            })
        }
    }
}
