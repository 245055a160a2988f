use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::kernel::constants;
use crate::module_system::definition::{
    DependencyList, ModuleDefinition, ModuleDescriptor, StartBehavior, StartResult, StopBehavior,
    StopResult,
};
use crate::module_system::error::{DefinitionFault, ModuleSystemError};
use crate::module_system::record::ModuleRecord;
use crate::module_system::value::{Dependencies, ModuleValue};

/// Whether `name` is a valid module identifier: letters, digits, `-` and `_`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Registry of module records, kept in registration order.
#[derive(Debug)]
pub struct ModuleRegistry {
    modules: Vec<Arc<ModuleRecord>>,
    index: HashMap<String, usize>,
    anonymous_prefix: String,
    anonymous_count: u64,
    closed: bool,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::with_anonymous_prefix(constants::DEFAULT_ANONYMOUS_PREFIX)
    }

    pub fn with_anonymous_prefix(prefix: impl Into<String>) -> Self {
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            anonymous_prefix: prefix.into(),
            anonymous_count: 0,
            closed: false,
        }
    }

    /// Validate a definition and store it as a new record.
    pub fn register(&mut self, definition: ModuleDefinition) -> Result<Arc<ModuleRecord>, ModuleSystemError> {
        let ModuleDefinition {
            name,
            dependencies,
            start,
            stop,
            backing,
        } = definition;

        if self.closed {
            return Err(ModuleSystemError::RegistrationClosed {
                module: name.unwrap_or_else(|| "<anonymous>".to_string()),
            });
        }

        let (name, anonymous) = match name {
            Some(name) => (name, false),
            None => (self.generate_anonymous_name(), true),
        };

        if self.index.contains_key(&name) {
            return Err(ModuleSystemError::invalid(name, DefinitionFault::Duplicate));
        }
        if !is_valid_name(&name) {
            return Err(ModuleSystemError::invalid(name, DefinitionFault::InvalidName));
        }

        let dependency_names = dependencies.map(DependencyList::into_vec).unwrap_or_default();
        if dependency_names.iter().any(|dependency| *dependency == name) {
            return Err(ModuleSystemError::invalid(name, DefinitionFault::SelfDependency));
        }
        let invalid: Vec<String> = dependency_names
            .iter()
            .filter(|dependency| !is_valid_name(dependency))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(ModuleSystemError::invalid(
                name,
                DefinitionFault::InvalidDependencyNames(invalid),
            ));
        }

        let backing = backing.unwrap_or_else(|| {
            ModuleValue::new(ModuleDescriptor {
                name: name.clone(),
                dependencies: dependency_names.clone(),
            })
        });
        let start = start.unwrap_or_else(|| default_start(backing));
        let stop = stop.unwrap_or_else(default_stop);

        log::debug!(
            "Registered module '{}'{} with dependencies [{}]",
            name,
            if anonymous { " (anonymous)" } else { "" },
            dependency_names.join(", ")
        );
        let record = Arc::new(ModuleRecord::new(name.clone(), anonymous, dependency_names, start, stop));
        self.index.insert(name, self.modules.len());
        self.modules.push(Arc::clone(&record));
        Ok(record)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModuleRecord>> {
        self.index.get(name).map(|&position| Arc::clone(&self.modules[position]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.modules.iter().map(|record| record.name().to_string()).collect()
    }

    pub fn modules(&self) -> &[Arc<ModuleRecord>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Refuse every later registration.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn generate_anonymous_name(&mut self) -> String {
        loop {
            self.anonymous_count += 1;
            let candidate = format!("{}-{}", self.anonymous_prefix, self.anonymous_count);
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_start(backing: ModuleValue) -> StartBehavior {
    Arc::new(move |_: Dependencies| -> BoxFuture<'static, StartResult> {
        let backing = backing.clone();
        async move { Ok(Some(backing)) }.boxed()
    })
}

fn default_stop() -> StopBehavior {
    Arc::new(|_: Option<ModuleValue>, _: Dependencies| -> BoxFuture<'static, StopResult> {
        async { Ok(()) }.boxed()
    })
}
