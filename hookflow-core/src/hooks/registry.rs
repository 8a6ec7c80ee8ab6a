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

//! Hook registry keyed by unique hook name.

use super::definition::{HookDefinition, Timing};
use crate::config::DuplicatePolicy;
use crate::error::ConfigError;
use crate::operation::OperationKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry of hook definitions.
///
/// Lookups merge target-specific and `any` hooks into a single ordering by
/// `(priority, registration order)`, so equal priorities keep the order in
/// which they were registered.
pub struct HookRegistry {
    hooks: DashMap<String, HookDefinition>,
    next_sequence: AtomicU64,
    duplicate_policy: DuplicatePolicy,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl HookRegistry {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            hooks: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            duplicate_policy,
        }
    }

    /// Register a hook. Returns the definition it replaced, if any.
    ///
    /// A replacing definition keeps the registration position of the one it
    /// replaces. Under [`DuplicatePolicy::Reject`] an existing name is an
    /// error and the registry is left unchanged.
    pub fn register(
        &self,
        mut hook: HookDefinition,
    ) -> Result<Option<HookDefinition>, ConfigError> {
        match self.hooks.entry(hook.name.clone()) {
            Entry::Occupied(mut entry) => match self.duplicate_policy {
                DuplicatePolicy::Replace => {
                    hook.sequence = entry.get().sequence;
                    Ok(Some(entry.insert(hook)))
                }
                DuplicatePolicy::Reject => Err(ConfigError::DuplicateHook(entry.key().clone())),
            },
            Entry::Vacant(entry) => {
                hook.sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                entry.insert(hook);
                Ok(None)
            }
        }
    }

    /// Remove a hook by name.
    pub fn remove(&self, name: &str) -> Option<HookDefinition> {
        self.hooks.remove(name).map(|(_, hook)| hook)
    }

    pub fn get(&self, name: &str) -> Option<HookDefinition> {
        self.hooks.get(name).map(|h| h.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Enabled hooks for `timing` whose target is `kind` or `any`, in
    /// execution order.
    pub fn hooks_for(&self, timing: Timing, kind: OperationKind) -> Vec<HookDefinition> {
        let mut hooks: Vec<HookDefinition> = self
            .hooks
            .iter()
            .filter(|h| h.applies_to(timing, kind))
            .map(|h| h.value().clone())
            .collect();
        hooks.sort_by_key(|h| (h.priority, h.sequence));
        hooks
    }

    /// Enable or disable a hook. Returns false if no such hook exists.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.hooks.get_mut(name) {
            Some(mut hook) => {
                hook.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All registered hooks in registration order.
    pub fn list(&self) -> Vec<HookDefinition> {
        let mut hooks: Vec<HookDefinition> = self.hooks.iter().map(|r| r.value().clone()).collect();
        hooks.sort_by_key(|h| h.sequence);
        hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Clear all hooks.
    pub fn clear(&self) {
        self.hooks.clear();
    }
}
