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

//! Execution statistics for pipelines and individual hooks.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one hook name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookStatistics {
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time_us: u64,
    pub average_time_us: f64,
}

impl HookStatistics {
    fn record(&mut self, time_us: u64, success: bool) {
        self.executions += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_time_us += time_us;
        self.average_time_us = self.total_time_us as f64 / self.executions as f64;
    }
}

/// Point-in-time copy of an engine's statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Running average over successful executions.
    pub average_execution_time_us: f64,
    pub hooks: HashMap<String, HookStatistics>,
}

impl StatisticsSnapshot {
    /// Runs that have started but not finished yet.
    pub fn in_flight(&self) -> u64 {
        self.total_executions
            .saturating_sub(self.successful_executions + self.failed_executions)
    }

    pub fn success_rate(&self) -> f64 {
        let finished = self.successful_executions + self.failed_executions;
        if finished == 0 {
            0.0
        } else {
            self.successful_executions as f64 / finished as f64
        }
    }

    pub fn hook(&self, name: &str) -> Option<&HookStatistics> {
        self.hooks.get(name)
    }
}

/// Statistics shared by all runs of one engine.
#[derive(Debug, Default)]
pub struct EngineStatistics {
    inner: Mutex<StatisticsSnapshot>,
}

impl EngineStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline_started(&self) {
        self.inner.lock().total_executions += 1;
    }

    pub fn pipeline_succeeded(&self, execution_time_us: u64) {
        let mut stats = self.inner.lock();
        stats.successful_executions += 1;
        let n = stats.successful_executions as f64;
        stats.average_execution_time_us =
            (stats.average_execution_time_us * (n - 1.0) + execution_time_us as f64) / n;
    }

    pub fn pipeline_failed(&self) {
        self.inner.lock().failed_executions += 1;
    }

    pub fn hook_succeeded(&self, hook_name: &str, execution_time_us: u64) {
        self.record_hook(hook_name, execution_time_us, true);
    }

    pub fn hook_failed(&self, hook_name: &str, execution_time_us: u64) {
        self.record_hook(hook_name, execution_time_us, false);
    }

    fn record_hook(&self, hook_name: &str, execution_time_us: u64, success: bool) {
        let mut stats = self.inner.lock();
        match stats.hooks.get_mut(hook_name) {
            Some(entry) => entry.record(execution_time_us, success),
            None => {
                let mut entry = HookStatistics::default();
                entry.record(execution_time_us, success);
                stats.hooks.insert(hook_name.to_string(), entry);
            }
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.inner.lock().clone()
    }

    pub fn reset(&self) {
        *self.inner.lock() = StatisticsSnapshot::default();
    }
}
