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

//! Main-operation dispatcher.

use super::{Collaborators, Operation, OperationKind, OperationOutput, WorktreeAction};
use crate::error::{CollaboratorError, DispatchError};
use crate::events::{EngineEvent, EventBus};
use crate::hooks::ExecutionContext;
use std::sync::Arc;
use std::time::Instant;

/// Runs the main operation of a pipeline against its collaborator.
///
/// Operations that produce state later hooks care about write it into the
/// context's side channels: a parse stores its structural data, a model
/// session stores the open session.
#[derive(Debug, Clone)]
pub struct OperationDispatcher {
    collaborators: Collaborators,
    events: EventBus,
}

impl OperationDispatcher {
    pub fn new(collaborators: Collaborators, events: EventBus) -> Self {
        Self {
            collaborators,
            events,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub async fn dispatch(
        &self,
        context: &mut ExecutionContext,
    ) -> Result<OperationOutput, DispatchError> {
        let kind = context.kind();
        let execution_id = context.execution_id;
        let start = Instant::now();

        self.events.publish(EngineEvent::OperationStarted { execution_id, kind });
        tracing::debug!(execution_id = %execution_id, operation = %kind, "Dispatching operation");

        let output = match context.operation.clone() {
            Operation::Parse { file_path, options } => {
                let parser = self
                    .collaborators
                    .parser
                    .as_ref()
                    .ok_or(DispatchError::CollaboratorUnavailable(kind))?;
                let data = parser
                    .parse_file(&file_path, &options)
                    .await
                    .map_err(|e| collaborator_failed(kind, e))?;
                context.ast_data = Some(Arc::new(data.clone()));
                OperationOutput::Parse { data }
            }
            Operation::ModelSession { config, prompt } => {
                let sessions = self
                    .collaborators
                    .sessions
                    .as_ref()
                    .ok_or(DispatchError::CollaboratorUnavailable(kind))?;
                let session = sessions
                    .create_session(&config)
                    .await
                    .map_err(|e| collaborator_failed(kind, e))?;
                // The session stays visible to post hooks even if the prompt fails.
                context.session = Some(Arc::new(session.clone()));
                let response = match prompt {
                    Some(prompt) => Some(
                        sessions
                            .process_context(&session, &prompt)
                            .await
                            .map_err(|e| collaborator_failed(kind, e))?,
                    ),
                    None => None,
                };
                OperationOutput::ModelSession { session, response }
            }
            Operation::Worktree { path, action } => {
                let worktrees = self
                    .collaborators
                    .worktrees
                    .as_ref()
                    .ok_or(DispatchError::CollaboratorUnavailable(kind))?;
                let (found, watch, state) = match action {
                    WorktreeAction::Discover => (
                        worktrees
                            .discover_worktrees(&path)
                            .await
                            .map_err(|e| collaborator_failed(kind, e))?,
                        None,
                        None,
                    ),
                    WorktreeAction::Watch => (
                        Vec::new(),
                        Some(
                            worktrees
                                .watch_files(&path)
                                .await
                                .map_err(|e| collaborator_failed(kind, e))?,
                        ),
                        None,
                    ),
                    WorktreeAction::State => (
                        Vec::new(),
                        None,
                        Some(
                            worktrees
                                .get_worktree_state(&path)
                                .await
                                .map_err(|e| collaborator_failed(kind, e))?,
                        ),
                    ),
                };
                OperationOutput::Worktree {
                    action,
                    worktrees: found,
                    watch,
                    state,
                }
            }
            Operation::ContextAssembly { files, task } => {
                let parser = self
                    .collaborators
                    .parser
                    .as_ref()
                    .ok_or(DispatchError::CollaboratorUnavailable(kind))?;
                let assembled = parser
                    .generate_context(&files, &task)
                    .await
                    .map_err(|e| collaborator_failed(kind, e))?;
                OperationOutput::ContextAssembly { context: assembled }
            }
        };

        let execution_time_us = start.elapsed().as_micros() as u64;
        self.events.publish(EngineEvent::OperationCompleted {
            execution_id,
            kind,
            execution_time_us,
        });
        tracing::debug!(
            execution_id = %execution_id,
            operation = %kind,
            execution_time_us,
            "Operation completed"
        );

        Ok(output)
    }
}

fn collaborator_failed(kind: OperationKind, source: CollaboratorError) -> DispatchError {
    DispatchError::Collaborator { kind, source }
}
