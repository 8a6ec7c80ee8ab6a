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

//! Hookflow telemetry (logging setup + engine event mirroring).

use anyhow::Context;
use hookflow_core::EngineEvent;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LOG: &str = "HOOKFLOW_LOG";
pub const ENV_LOG_FORMAT: &str = "HOOKFLOW_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{}', expected pretty or json", other),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `hookflow_core=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Read `HOOKFLOW_LOG` and `HOOKFLOW_LOG_FORMAT`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.format = format
                .parse()
                .with_context(|| format!("invalid {}", ENV_LOG_FORMAT))?;
        }
        Ok(config)
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Install the global tracing subscriber.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter '{}'", config.filter))?;

    let (json_layer, pretty_layer) = match config.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
        ),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// Mirror an engine's event stream into tracing records until the engine
/// is dropped.
pub fn spawn_event_logger(mut receiver: broadcast::Receiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind engine events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Event logger stopped");
    })
}

/// Severity an event is logged at.
pub fn event_level(event: &EngineEvent) -> tracing::Level {
    match event {
        EngineEvent::HookError { .. } | EngineEvent::PipelineError { .. } => tracing::Level::WARN,
        EngineEvent::HookRegistered { .. } | EngineEvent::HookRemoved { .. } => {
            tracing::Level::INFO
        }
        EngineEvent::PipelineStarted { .. }
        | EngineEvent::PipelineCompleted { .. }
        | EngineEvent::OperationStarted { .. }
        | EngineEvent::OperationCompleted { .. }
        | EngineEvent::HookSkipped { .. } => tracing::Level::DEBUG,
        EngineEvent::HookStarted { .. } | EngineEvent::HookCompleted { .. } => {
            tracing::Level::TRACE
        }
    }
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::HookRegistered {
            hook_name,
            timing,
            target,
            priority,
        } => tracing::info!(
            hook = %hook_name,
            timing = ?timing,
            target = %target,
            priority,
            "hook_registered"
        ),
        EngineEvent::HookRemoved { hook_name } => {
            tracing::info!(hook = %hook_name, "hook_removed")
        }
        EngineEvent::PipelineStarted {
            execution_id,
            operation,
        } => tracing::debug!(
            execution_id = %execution_id,
            operation = %operation.kind(),
            "pipeline_started"
        ),
        EngineEvent::HookStarted {
            execution_id,
            hook_name,
            phase,
        } => tracing::trace!(
            execution_id = %execution_id,
            hook = %hook_name,
            phase = %phase,
            "hook_started"
        ),
        EngineEvent::HookCompleted {
            execution_id,
            hook_name,
            phase,
            execution_time_us,
            ..
        } => tracing::trace!(
            execution_id = %execution_id,
            hook = %hook_name,
            phase = %phase,
            execution_time_us,
            "hook_completed"
        ),
        EngineEvent::HookSkipped {
            execution_id,
            hook_name,
            phase,
            reason,
        } => tracing::debug!(
            execution_id = %execution_id,
            hook = %hook_name,
            phase = %phase,
            reason = %reason,
            "hook_skipped"
        ),
        EngineEvent::HookError {
            execution_id,
            hook_name,
            phase,
            error,
        } => tracing::warn!(
            execution_id = %execution_id,
            hook = %hook_name,
            phase = %phase,
            error = %error,
            "hook_error"
        ),
        EngineEvent::OperationStarted { execution_id, kind } => tracing::debug!(
            execution_id = %execution_id,
            operation = %kind,
            "operation_started"
        ),
        EngineEvent::OperationCompleted {
            execution_id,
            kind,
            execution_time_us,
        } => tracing::debug!(
            execution_id = %execution_id,
            operation = %kind,
            execution_time_us,
            "operation_completed"
        ),
        EngineEvent::PipelineCompleted {
            execution_id,
            execution_time_us,
            results,
        } => tracing::debug!(
            execution_id = %execution_id,
            execution_time_us,
            results = results.len(),
            "pipeline_completed"
        ),
        EngineEvent::PipelineError {
            execution_id,
            error,
        } => tracing::warn!(
            execution_id = %execution_id,
            error = %error,
            "pipeline_error"
        ),
    }
}
