use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error raised by user constructors.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error type for every container operation
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Cannot change mappings after the container has been frozen")]
    Frozen,

    #[error("Circular dependency detected while resolving '{type_name}': {}", .chain.join(" <- "))]
    CircularDependency {
        type_name: String,
        chain: Vec<String>,
    },

    #[error("Error instantiating '{type_name}', constructor path: {}", .chain.join(" <- "))]
    Construction {
        type_name: String,
        chain: Vec<String>,
        #[source]
        source: BoxError,
    },

    #[error("No instance available for constructor parameter {index} of type '{parameter}'")]
    MissingDependency { parameter: String, index: usize },

    #[error("'{to}' cannot be mapped to '{from}'")]
    IncompatibleMapping { from: String, to: String },

    #[error("Instance of '{actual}' cannot be viewed as '{expected}'")]
    IncompatibleInstance { expected: String, actual: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },
}

impl CoreError {
    /// Create a new circular dependency error
    pub fn circular_dependency(type_name: impl Into<String>, chain: Vec<String>) -> Self {
        Self::CircularDependency {
            type_name: type_name.into(),
            chain,
        }
    }

    /// Wrap a constructor failure together with the in-progress chain
    pub fn construction(type_name: impl Into<String>, chain: Vec<String>, source: BoxError) -> Self {
        Self::Construction {
            type_name: type_name.into(),
            chain,
            source,
        }
    }

    pub fn missing_dependency(parameter: impl Into<String>, index: usize) -> Self {
        Self::MissingDependency {
            parameter: parameter.into(),
            index,
        }
    }

    pub fn incompatible_mapping(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::IncompatibleMapping {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn incompatible_instance(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IncompatibleInstance {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn lock_error(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Check if the error is a frozen container error
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen)
    }

    /// Check if the error is a construction failure
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }

    /// Check if a circular dependency caused this error, directly or through
    /// any number of wrapped construction failures.
    pub fn is_circular_dependency(&self) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = Some(self);
        while let Some(error) = current {
            if let Some(Self::CircularDependency { .. }) = error.downcast_ref::<Self>() {
                return true;
            }
            current = error.source();
        }
        false
    }

    /// The constructor chain recorded by cycle and construction errors,
    /// most recent first.
    pub fn chain(&self) -> &[String] {
        match self {
            Self::CircularDependency { chain, .. } | Self::Construction { chain, .. } => chain,
            _ => &[],
        }
    }
}
