//! Constructor-injection resolution engine.
//!
//! Types describe themselves through [`Reflect`]: their constructors, the
//! interfaces they can be viewed as and their shape. A [`Container`] maps
//! abstract types to concrete ones or to fixed instances and builds object
//! graphs by picking the constructor with the most satisfiable parameters.
//!
//! Beyond plain resolution the container understands positional
//! constructor overrides, `Vec<Arc<T>>`/[`Many`] collections of every
//! mapping, deferred [`Lazy`] and [`Func`] handles, open generic
//! definitions, default parameter values and circular dependency
//! detection. Implicitly built instances are cached weakly and rebuilt once
//! every owner dropped them.

pub mod config;
pub mod container;
pub mod errors;

pub use config::ContainerOptions;
pub use container::{
    Arg, ArgComparer, ArrayDefinition, Binding, Constructor, Container, ContainerBuilder, DependencyResolver, Func,
    FuncDefinition, Instance, IntoArg, Lazy, LazyDefinition, Many, Parameter, ParameterInfo, Reflect,
    SequenceDefinition, Type, TypeInfo, TypeKind,
};
pub use errors::{BoxError, CoreError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
