pub(crate) mod activator;
pub mod autowiring;
pub mod binding;
pub mod builder;
pub mod descriptor;
pub mod factory;
pub mod instance;
pub mod ioc_container;
pub mod key;
pub mod resolver;

pub use autowiring::{IntoConstructor, IntoFallibleConstructor, Parameter};
pub use binding::{Binding, MappingStore};
pub use builder::ContainerBuilder;
pub use descriptor::{Constructor, GenericInfo, ParameterInfo, Reflect, Type, TypeInfo, TypeInfoBuilder, TypeKind};
pub use factory::{ArrayDefinition, Deferred, Func, FuncDefinition, Lazy, LazyDefinition, Many, SequenceDefinition};
pub use instance::{Instance, WeakInstance};
pub use ioc_container::{Container, DependencyResolver};
pub use key::{Arg, ArgComparer, ArgData, IntoArg, TypeKey};
pub use resolver::ResolutionPath;
