//! Filter registry.
//!
//! Built once at startup from an explicit registration list and shared
//! read-only afterwards.

use std::collections::HashMap;

use crate::config::FilterConfig;
use crate::filters::builtin::{AuthFilter, InspectorFilter};
use crate::filters::Filter;

/// Error raised while populating the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("filter '{0}' is already registered")]
    Duplicate(String),
    #[error("filter name '{0}' is empty or contains a comma")]
    InvalidName(String),
}

/// Name → filter mapping.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the filters shipped with the gateway.
    pub fn with_builtin(config: &FilterConfig) -> Self {
        let mut registry = Self::new();
        let builtin = [
            ("auth", Filter::pre(AuthFilter::new(config.auth_api_key.clone()))),
            ("inspector", Filter::post(InspectorFilter::new())),
        ];
        for (name, filter) in builtin {
            if let Err(e) = registry.register(name, filter) {
                tracing::error!(error = %e, "Failed to register builtin filter");
            }
        }
        registry
    }

    /// Register a filter under a unique name.
    ///
    /// Names travel comma-joined in a header, so they may not contain commas.
    pub fn register(&mut self, name: impl Into<String>, filter: Filter) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() || name.contains(',') {
            return Err(RegistryError::InvalidName(name));
        }
        if self.filters.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        tracing::debug!(filter = %name, phase = %filter.phase(), order = filter.order(), "Filter registered");
        self.filters.insert(name, filter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
