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

//! Hook definitions, registry, handlers and the chain executor.

mod chain;
mod context;
mod definition;
mod handlers;
mod record;
mod registry;

pub use chain::ChainExecutor;
pub use context::{ExecutionContext, ExecutionId, HookContext};
pub use definition::{
    Condition, HookConfig, HookDefinition, HookPriority, HookTarget, Phase, Timing,
    DEFAULT_HOOK_TIMEOUT_MS,
};
pub use handlers::{
    AsyncHookHandler, CallbackHandler, FnHandler, HandlerCatalog, HookHandler, LoggingHandler,
    NoOpHandler,
};
pub use record::{HookExecutionRecord, HookOutcome, HookStatus, SkipReason};
pub use registry::HookRegistry;
