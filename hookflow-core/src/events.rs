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

//! Lifecycle events published by the engine.

use crate::hooks::{ExecutionId, HookTarget, Phase, SkipReason, Timing};
use crate::operation::{Operation, OperationKind};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A notification about the engine's state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    HookRegistered {
        hook_name: String,
        timing: Timing,
        target: HookTarget,
        priority: i32,
    },
    HookRemoved {
        hook_name: String,
    },
    PipelineStarted {
        execution_id: ExecutionId,
        operation: Operation,
    },
    HookStarted {
        execution_id: ExecutionId,
        hook_name: String,
        phase: Phase,
    },
    HookCompleted {
        execution_id: ExecutionId,
        hook_name: String,
        phase: Phase,
        result: serde_json::Value,
        execution_time_us: u64,
    },
    HookSkipped {
        execution_id: ExecutionId,
        hook_name: String,
        phase: Phase,
        reason: SkipReason,
    },
    HookError {
        execution_id: ExecutionId,
        hook_name: String,
        phase: Phase,
        error: String,
    },
    OperationStarted {
        execution_id: ExecutionId,
        kind: OperationKind,
    },
    OperationCompleted {
        execution_id: ExecutionId,
        kind: OperationKind,
        execution_time_us: u64,
    },
    PipelineCompleted {
        execution_id: ExecutionId,
        execution_time_us: u64,
        results: HashMap<String, serde_json::Value>,
    },
    PipelineError {
        execution_id: ExecutionId,
        error: String,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::HookRegistered { .. } => "hook_registered",
            EngineEvent::HookRemoved { .. } => "hook_removed",
            EngineEvent::PipelineStarted { .. } => "pipeline_started",
            EngineEvent::HookStarted { .. } => "hook_started",
            EngineEvent::HookCompleted { .. } => "hook_completed",
            EngineEvent::HookSkipped { .. } => "hook_skipped",
            EngineEvent::HookError { .. } => "hook_error",
            EngineEvent::OperationStarted { .. } => "operation_started",
            EngineEvent::OperationCompleted { .. } => "operation_completed",
            EngineEvent::PipelineCompleted { .. } => "pipeline_completed",
            EngineEvent::PipelineError { .. } => "pipeline_error",
        }
    }

    /// Execution this event belongs to, if it is tied to a pipeline run.
    pub fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            EngineEvent::HookRegistered { .. } | EngineEvent::HookRemoved { .. } => None,
            EngineEvent::PipelineStarted { execution_id, .. }
            | EngineEvent::HookStarted { execution_id, .. }
            | EngineEvent::HookCompleted { execution_id, .. }
            | EngineEvent::HookSkipped { execution_id, .. }
            | EngineEvent::HookError { execution_id, .. }
            | EngineEvent::OperationStarted { execution_id, .. }
            | EngineEvent::OperationCompleted { execution_id, .. }
            | EngineEvent::PipelineCompleted { execution_id, .. }
            | EngineEvent::PipelineError { execution_id, .. } => Some(*execution_id),
        }
    }
}

/// Broadcast bus for [`EngineEvent`]s.
///
/// Publishing never waits on subscribers: a receiver that falls behind by
/// more than the channel capacity observes `RecvError::Lagged` and loses
/// the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns the number of receivers it reached.
    pub fn publish(&self, event: EngineEvent) -> usize {
        tracing::trace!(event = event.name(), "Publishing engine event");
        // No subscribers is not an error.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let delivered = bus.publish(EngineEvent::HookRemoved {
            hook_name: "gone".to_string(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(EngineEvent::HookRemoved {
            hook_name: "a".to_string(),
        });
        bus.publish(EngineEvent::HookRemoved {
            hook_name: "b".to_string(),
        });

        for expected in ["a", "b"] {
            match rx.recv().await.unwrap() {
                EngineEvent::HookRemoved { hook_name } => assert_eq!(hook_name, expected),
                other => panic!("unexpected event {}", other.name()),
            }
        }
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let id = ExecutionId::new();
        let event = EngineEvent::PipelineError {
            execution_id: id,
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "pipeline_error");
        assert_eq!(json["error"], "boom");
        assert_eq!(event.execution_id(), Some(id));
    }
}
