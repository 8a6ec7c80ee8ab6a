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

//! Records of individual hook executions within a run.

use super::definition::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    Success,
    Error,
    Skipped,
}

/// Why a gate skipped a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    DependenciesNotMet,
    ConditionsNotMet,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DependenciesNotMet => f.write_str("dependencies-not-met"),
            SkipReason::ConditionsNotMet => f.write_str("conditions-not-met"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HookOutcome {
    Success {
        result: serde_json::Value,
        execution_time_us: u64,
    },
    Error {
        message: String,
        execution_time_us: u64,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// One hook's execution in one run. Appended once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookExecutionRecord {
    pub hook_name: String,
    pub phase: Phase,
    #[serde(flatten)]
    pub outcome: HookOutcome,
}

impl HookExecutionRecord {
    pub fn success(
        hook_name: impl Into<String>,
        phase: Phase,
        result: serde_json::Value,
        execution_time_us: u64,
    ) -> Self {
        Self {
            hook_name: hook_name.into(),
            phase,
            outcome: HookOutcome::Success {
                result,
                execution_time_us,
            },
        }
    }

    pub fn error(
        hook_name: impl Into<String>,
        phase: Phase,
        message: impl Into<String>,
        execution_time_us: u64,
    ) -> Self {
        Self {
            hook_name: hook_name.into(),
            phase,
            outcome: HookOutcome::Error {
                message: message.into(),
                execution_time_us,
            },
        }
    }

    pub fn skipped(hook_name: impl Into<String>, phase: Phase, reason: SkipReason) -> Self {
        Self {
            hook_name: hook_name.into(),
            phase,
            outcome: HookOutcome::Skipped { reason },
        }
    }

    pub fn status(&self) -> HookStatus {
        match self.outcome {
            HookOutcome::Success { .. } => HookStatus::Success,
            HookOutcome::Error { .. } => HookStatus::Error,
            HookOutcome::Skipped { .. } => HookStatus::Skipped,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            HookOutcome::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.outcome {
            HookOutcome::Skipped { reason } => Some(reason),
            _ => None,
        }
    }
}
