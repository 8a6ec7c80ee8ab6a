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

//! Hook handler traits and implementations.

use super::context::HookContext;
use crate::error::{ConfigError, HookError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Trait for asynchronous hook handlers.
///
/// A handler returns the value stored under its hook's name in the run's
/// results, or fails. Handlers may suspend freely; the engine bounds them
/// with the hook's timeout.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, context: &HookContext) -> Result<Value, HookError>;

    /// Get the handler name.
    fn name(&self) -> &str;
}

/// Type alias for a shared async hook handler.
pub type AsyncHookHandler = Arc<dyn HookHandler>;

/// A no-op handler for testing.
pub struct NoOpHandler {
    name: String,
}

impl NoOpHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl HookHandler for NoOpHandler {
    async fn handle(&self, _context: &HookContext) -> Result<Value, HookError> {
        Ok(serde_json::json!({ "ok": true }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that logs each invocation (for debugging).
pub struct LoggingHandler {
    name: String,
}

impl LoggingHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl HookHandler for LoggingHandler {
    async fn handle(&self, context: &HookContext) -> Result<Value, HookError> {
        tracing::info!(
            handler = %self.name,
            hook = %context.hook_name,
            execution_id = %context.execution_id,
            phase = %context.phase,
            target = %context.target,
            "Hook invoked"
        );
        Ok(serde_json::json!({ "logged": true }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that invokes a synchronous callback.
///
/// The callback runs on the blocking thread pool, so a slow callback is
/// still bounded by the hook's timeout. A callback that outlives its timeout
/// keeps its thread until it returns.
pub struct CallbackHandler<F>
where
    F: Fn(&HookContext) -> Result<Value, HookError> + Send + Sync,
{
    name: String,
    callback: Arc<F>,
}

impl<F> CallbackHandler<F>
where
    F: Fn(&HookContext) -> Result<Value, HookError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl<F> HookHandler for CallbackHandler<F>
where
    F: Fn(&HookContext) -> Result<Value, HookError> + Send + Sync + 'static,
{
    async fn handle(&self, context: &HookContext) -> Result<Value, HookError> {
        let callback = Arc::clone(&self.callback);
        let context = context.clone();

        match tokio::task::spawn_blocking(move || (*callback)(&context)).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => Err(HookError::Panicked(self.name.clone())),
            Err(join_err) => Err(HookError::failed(join_err.to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler backed by an async closure that receives an owned context.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HookError>> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> HookHandler for FnHandler<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HookError>> + Send + 'static,
{
    async fn handle(&self, context: &HookContext) -> Result<Value, HookError> {
        (self.func)(context.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Named handlers that declarative hook manifests bind to.
#[derive(Default)]
pub struct HandlerCatalog {
    handlers: DashMap<String, AsyncHookHandler>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named handler. Names are unique within a catalog.
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: impl HookHandler + 'static,
    ) -> Result<(), ConfigError> {
        self.register_shared(name, Arc::new(handler))
    }

    pub fn register_shared(
        &self,
        name: impl Into<String>,
        handler: AsyncHookHandler,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyHookName);
        }
        if self.handlers.contains_key(&name) {
            return Err(ConfigError::DuplicateHook(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<AsyncHookHandler> {
        self.handlers.get(name).map(|h| h.clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
