use std::env;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::key::ArgComparer;
use crate::errors::CoreError;

/// Environment variable toggling automatic `Lazy<T>` resolution.
pub const RESOLVE_LAZY_VAR: &str = "AUTOWIRE_RESOLVE_LAZY";

/// Environment variable toggling automatic `Func<Args, R>` resolution.
pub const RESOLVE_FUNC_VAR: &str = "AUTOWIRE_RESOLVE_FUNC";

/// Container behaviour switches, fixed at construction time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Resolve `Lazy<T>` requests automatically
    pub resolve_lazy: bool,
    /// Resolve `Func<Args, R>` requests automatically
    pub resolve_func: bool,
    /// Equality strategy for override lists, positional by default
    #[serde(skip)]
    pub comparer: Option<Arc<dyn ArgComparer>>,
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from environment variables, starting from the defaults
    pub fn from_env() -> Result<Self, CoreError> {
        let mut options = Self::new();
        if let Some(value) = env_flag(RESOLVE_LAZY_VAR)? {
            options.resolve_lazy = value;
        }
        if let Some(value) = env_flag(RESOLVE_FUNC_VAR)? {
            options.resolve_func = value;
        }
        Ok(options)
    }

    pub fn resolve_lazy(mut self, enabled: bool) -> Self {
        self.resolve_lazy = enabled;
        self
    }

    pub fn resolve_func(mut self, enabled: bool) -> Self {
        self.resolve_func = enabled;
        self
    }

    pub fn comparer(mut self, comparer: impl ArgComparer + 'static) -> Self {
        self.comparer = Some(Arc::new(comparer));
        self
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            resolve_lazy: true,
            resolve_func: false,
            comparer: None,
        }
    }
}

impl fmt::Debug for ContainerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOptions")
            .field("resolve_lazy", &self.resolve_lazy)
            .field("resolve_func", &self.resolve_func)
            .field("comparer", &self.comparer.as_ref().map(|_| "custom"))
            .finish()
    }
}

fn env_flag(name: &str) -> Result<Option<bool>, CoreError> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(CoreError::configuration(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}
