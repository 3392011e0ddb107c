use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::container::descriptor::Reflect;
use crate::container::ioc_container::Container;
use crate::container::key::{Arg, ArgComparer};
use crate::errors::CoreError;

type Registration = Box<dyn FnOnce(&Container) -> Result<(), CoreError> + Send>;

/// Builder for a container with fluent API
///
/// Registrations are replayed in order by [`ContainerBuilder::build`], so
/// the last mapping of a type still wins.
pub struct ContainerBuilder {
    options: ContainerOptions,
    registrations: Vec<Registration>,
    freeze: bool,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            options: ContainerOptions::default(),
            registrations: Vec::new(),
            freeze: false,
        }
    }

    pub fn options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn resolve_lazy(&mut self, enabled: bool) -> &mut Self {
        self.options.resolve_lazy = enabled;
        self
    }

    pub fn resolve_func(&mut self, enabled: bool) -> &mut Self {
        self.options.resolve_func = enabled;
        self
    }

    pub fn comparer(&mut self, comparer: impl ArgComparer + 'static) -> &mut Self {
        self.options.comparer = Some(Arc::new(comparer));
        self
    }

    pub fn map<From: Reflect + ?Sized, To: Reflect + ?Sized>(&mut self) -> &mut Self {
        self.register(|container| container.map::<From, To>().map(|_| ()))
    }

    pub fn map_with<From: Reflect + ?Sized, To: Reflect + ?Sized>(&mut self, overrides: Vec<Arg>) -> &mut Self {
        self.register(move |container| container.map_with::<From, To>(overrides).map(|_| ()))
    }

    pub fn map_instance<I: Reflect + ?Sized, C: Reflect + Send + Sync>(&mut self, instance: Arc<C>) -> &mut Self {
        self.register(move |container| container.map_instance::<I, C>(instance).map(|_| ()))
    }

    pub fn map_value<T: Reflect + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.register(move |container| container.map_value(value).map(|_| ()))
    }

    pub fn declare<T: Reflect + ?Sized>(&mut self) -> &mut Self {
        self.register(|container| container.declare::<T>().map(|_| ()))
    }

    /// Freeze the container once every registration is applied
    pub fn freeze(&mut self) -> &mut Self {
        self.freeze = true;
        self
    }

    fn register(&mut self, registration: impl FnOnce(&Container) -> Result<(), CoreError> + Send + 'static) -> &mut Self {
        self.registrations.push(Box::new(registration));
        self
    }

    /// Build the container
    pub fn build(self) -> Result<Arc<Container>, CoreError> {
        let container = Container::with_options(self.options);
        for registration in self.registrations {
            registration(&container)?;
        }
        if self.freeze {
            container.freeze();
        }
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::descriptor::TypeInfo;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    impl Reflect for FixedClock {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .constructor(|start: u64| FixedClock(start))
                .implements::<dyn Clock>(|clock| clock)
                .build()
        }
    }

    impl Reflect for dyn Clock {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>().build()
        }
    }

    #[test]
    fn test_container_builder() {
        let mut builder = ContainerBuilder::new();
        builder.map::<dyn Clock, FixedClock>().map_value(42u64);
        let container = builder.build().unwrap();

        let clock = container.get::<dyn Clock>().unwrap().unwrap();
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_builder_applies_options_and_freeze() {
        let mut builder = ContainerBuilder::new();
        builder.resolve_func(true).resolve_lazy(false).freeze();
        let container = builder.build().unwrap();

        assert!(container.options().resolve_func);
        assert!(!container.options().resolve_lazy);
        assert!(container.is_frozen());
        assert!(container.map_value(1u64).is_err());
    }

    #[test]
    fn test_builder_mapping_with_overrides() {
        let mut builder = ContainerBuilder::new();
        builder.map_with::<dyn Clock, FixedClock>(crate::args![7u64]);
        let container = builder.build().unwrap();

        assert_eq!(container.get::<dyn Clock>().unwrap().unwrap().now(), 7);
    }

    #[test]
    fn test_builder_surfaces_mapping_errors() {
        let mut builder = ContainerBuilder::new();
        builder.map::<dyn Clock, u64>();

        assert!(matches!(builder.build(), Err(CoreError::IncompatibleMapping { .. })));
    }
}
