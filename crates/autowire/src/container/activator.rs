use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};

use tracing::{debug, trace, warn};

use crate::container::binding::Binding;
use crate::container::descriptor::{Constructor, ParameterInfo, Type, TypeKind};
use crate::container::instance::Instance;
use crate::container::ioc_container::{Container, Registry};
use crate::container::key::{Arg, TypeKey};
use crate::errors::{BoxError, CoreError};

/// Snapshot of a binding taken so the registry is not borrowed while
/// resolving through it.
struct Found {
    value: Option<Option<Instance>>,
    target: Option<Type>,
    defaults: Vec<Arg>,
}

impl Found {
    fn of(binding: &Binding) -> Self {
        Self {
            value: binding.value(),
            target: binding.target().cloned(),
            defaults: binding.default_overrides().to_vec(),
        }
    }
}

/// One top-level container call.
///
/// Runs while the container lock is held; nested calls on the same thread
/// open their own activator over the same registry and share its
/// resolution path.
pub(crate) struct Activator<'a> {
    container: &'a Container,
    registry: &'a RefCell<Registry>,
}

impl<'a> Activator<'a> {
    pub(crate) fn begin(container: &'a Container, registry: &'a RefCell<Registry>) -> Result<Self, CoreError> {
        let mut state = registry
            .try_borrow_mut()
            .map_err(|_| CoreError::lock_error("container registry"))?;
        if state.depth == 0 {
            state.path.clear();
        }
        state.depth += 1;
        drop(state);
        Ok(Self { container, registry })
    }

    fn registry(&self) -> Result<Ref<'a, Registry>, CoreError> {
        self.registry
            .try_borrow()
            .map_err(|_| CoreError::lock_error("container registry"))
    }

    fn registry_mut(&self) -> Result<RefMut<'a, Registry>, CoreError> {
        self.registry
            .try_borrow_mut()
            .map_err(|_| CoreError::lock_error("container registry"))
    }

    fn key(&self, ty: &Type, args: &[Arg]) -> TypeKey {
        TypeKey::new(ty.clone(), args.to_vec(), self.container.options().comparer.clone())
    }

    /// Resolve a single instance of `ty` built with `overrides`.
    pub(crate) fn get(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError> {
        let key = self.key(ty, overrides);
        let found = self.registry()?.store.last(&key).map(Found::of);
        let mapped = found.is_some();

        if let Some(found) = found {
            if let Some(value) = found.value {
                trace!(type_name = ty.name(), "resolved from binding");
                return Ok(value);
            }
            if let Some(target) = found.target.filter(|target| target != ty) {
                trace!(from = ty.name(), to = target.name(), "following mapping");
                return self.get(&target, &found.defaults);
            }
            debug!(type_name = ty.name(), "rebuilding reclaimed instance");
        }

        match ty.kind() {
            TypeKind::Value if overrides.is_empty() => return Ok(ty.default_instance()),
            TypeKind::Str if overrides.is_empty() => return Ok(None),
            _ => {}
        }

        let instance = self.instantiate(ty, overrides)?;
        let collection = matches!(ty.kind(), TypeKind::Array { .. } | TypeKind::Sequence { .. });
        // An absent closed generic may become resolvable once declared.
        let undeclared = instance.is_none() && ty.generic().is_some();
        if !collection && !undeclared {
            self.cache(key, mapped, &instance)?;
        }
        Ok(instance)
    }

    /// Resolve every explicit mapping of `element`, in registration order.
    pub(crate) fn get_all(&self, element: &Type) -> Result<Vec<Option<Instance>>, CoreError> {
        let key = self.key(element, &[]);
        let entries: Vec<Found> = self
            .registry()?
            .store
            .lookup(&key)
            .iter()
            .filter(|binding| binding.is_explicit())
            .map(Found::of)
            .collect();

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let item = match (entry.value, entry.target) {
                (Some(value), _) => value,
                (None, Some(target)) => self.get(&target, &entry.defaults)?,
                (None, None) => None,
            };
            items.push(item);
        }
        Ok(items)
    }

    fn cache(&self, key: TypeKey, mapped: bool, instance: &Option<Instance>) -> Result<(), CoreError> {
        let mut registry = self.registry_mut()?;

        match registry.store.last_mut(&key).filter(|_| mapped) {
            Some(binding) => binding.set_value(instance.clone()),
            None => {
                let mut binding = Binding::implicit(key.ty().clone(), key.args().to_vec());
                binding.set_value(instance.clone());
                registry.store.register(key.clone(), binding);
            }
        }

        debug!(key = ?key, present = instance.is_some(), "cached resolution");

        // Make the concrete type resolvable to the same object.
        if let Some(instance) = instance {
            let concrete = instance.instance_type();
            if key.args().is_empty() && concrete != key.ty() {
                let alias = self.key(concrete, &[]);
                if !registry.store.contains(&alias) {
                    let mut binding = Binding::implicit(concrete.clone(), Vec::new());
                    binding.set_value(Some(instance.clone()));
                    registry.store.register(alias, binding);
                }
            }
        }
        Ok(())
    }

    fn instantiate(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError> {
        let _entered = self.enter(ty)?;
        self.instantiate_core(ty, overrides, &mut Vec::new())
    }

    fn enter(&self, ty: &Type) -> Result<Entered<'a>, CoreError> {
        let mut registry = self.registry_mut()?;
        if let Err(error) = registry.path.push(ty.clone()) {
            warn!(type_name = ty.name(), path = %registry.path.path_string(), "circular dependency detected");
            return Err(error);
        }
        trace!(path = %registry.path.path_string(), "instantiating");
        Ok(Entered {
            registry: self.registry,
            ty: ty.clone(),
        })
    }

    fn instantiate_core(
        &self,
        ty: &Type,
        overrides: &[Arg],
        definitions: &mut Vec<TypeId>,
    ) -> Result<Option<Instance>, CoreError> {
        if let Some(generic) = ty.generic() {
            let definition = generic.definition();
            if let Some(target) = self.definition_target(definition, overrides)? {
                definitions.push(definition.id());
                if definitions.contains(&target.id()) {
                    let chain = self.registry().map(|registry| registry.path.chain()).unwrap_or_default();
                    return Err(CoreError::circular_dependency(target.name(), chain));
                }

                let key = (target.id(), generic.argument_ids());
                let closed = self.registry()?.closed_generics.get(&key).cloned();
                return match closed {
                    Some(closed) => {
                        debug!(from = ty.name(), to = closed.name(), "substituted generic definition");
                        self.instantiate_core(&closed, overrides, definitions)
                    }
                    None => {
                        warn!(
                            from = ty.name(),
                            definition = target.name(),
                            "generic instantiation was never declared on this container"
                        );
                        Ok(None)
                    }
                };
            }
        }

        match ty.kind() {
            TypeKind::Array { element, collect } | TypeKind::Sequence { element, collect } => {
                collect(self.get_all(element)?).map(Some)
            }
            TypeKind::Lazy { element, make } => {
                if !self.container.options().resolve_lazy {
                    return Ok(None);
                }
                Ok(Some(make(self.container.factories().deferred(element.clone()))))
            }
            TypeKind::Factory {
                parameters,
                result,
                make,
            } => {
                if !self.container.options().resolve_func {
                    return Ok(None);
                }
                let shape: Vec<Option<Type>> = parameters.iter().cloned().map(Some).collect();
                if parameters.is_empty() || match_constructor(result, &shape, true).is_some() {
                    Ok(Some(make(self.container.factories().deferred(result.clone()))))
                } else {
                    debug!(type_name = ty.name(), "no constructor of the result matches the factory arguments");
                    Ok(None)
                }
            }
            TypeKind::Interface | TypeKind::Definition => Ok(None),
            _ => self.construct(ty, overrides),
        }
    }

    fn definition_target(&self, definition: &Type, overrides: &[Arg]) -> Result<Option<Type>, CoreError> {
        let registry = self.registry()?;
        let mut binding = registry.store.last(&self.key(definition, overrides));
        if binding.is_none() && !overrides.is_empty() {
            binding = registry.store.last(&self.key(definition, &[]));
        }
        Ok(binding
            .and_then(Binding::target)
            .filter(|target| *target != definition)
            .cloned())
    }

    fn construct(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError> {
        ty.validate()?;
        let shape: Vec<Option<Type>> = overrides.iter().map(Arg::arg_type).collect();
        let Some(constructor) = match_constructor(ty, &shape, false) else {
            debug!(type_name = ty.name(), overrides = overrides.len(), "no matching constructor");
            return Ok(None);
        };

        let mut values = Vec::with_capacity(constructor.arity());
        for (index, parameter) in constructor.parameters().iter().enumerate() {
            let value = match overrides.get(index) {
                Some(arg) => arg.to_instance(),
                None => self.resolve_parameter(parameter)?,
            };
            values.push(value);
        }

        let instance = constructor
            .invoke(values)
            .map_err(|source| self.construction_error(ty, source))?;
        debug!(type_name = ty.name(), "constructed instance");
        Ok(Some(instance))
    }

    fn resolve_parameter(&self, parameter: &ParameterInfo) -> Result<Option<Instance>, CoreError> {
        let ty = parameter.parameter_type();
        let Some(default) = parameter.default_value() else {
            return self.get(&ty, &[]);
        };

        if self.registry()?.store.has_explicit(&self.key(&ty, &[])) {
            return self.get(&ty, &[]);
        }
        if ty.is_value() {
            return Ok(Some(default.clone()));
        }
        Ok(self.get(&ty, &[])?.or_else(|| Some(default.clone())))
    }

    fn construction_error(&self, ty: &Type, source: BoxError) -> CoreError {
        let source = match source.downcast::<CoreError>() {
            Ok(error) if error.is_construction() => return *error,
            Ok(error) => error as BoxError,
            Err(source) => source,
        };
        let chain = self
            .registry()
            .map(|registry| registry.path.chain())
            .unwrap_or_else(|_| vec![ty.name().to_string()]);
        warn!(type_name = ty.name(), error = %source, "constructor failed");
        CoreError::construction(ty.name(), chain, source)
    }
}

impl Drop for Activator<'_> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.try_borrow_mut() {
            registry.depth = registry.depth.saturating_sub(1);
        }
    }
}

/// Keeps a type on the resolution path while its constructor runs.
struct Entered<'a> {
    registry: &'a RefCell<Registry>,
    ty: Type,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.try_borrow_mut() {
            registry.path.pop(&self.ty);
        }
    }
}

/// Pick the constructor with the most parameters compatible with `shape`,
/// the first declared one on ties.
///
/// `shape` holds the runtime type of each leading override, `None` for a
/// null. Loose matching accepts assignable types and ignores extra
/// overrides; strict matching wants identical types and rejects extras.
pub(crate) fn match_constructor<'t>(ty: &'t Type, shape: &[Option<Type>], strict: bool) -> Option<&'t Constructor> {
    let mut best: Option<&'t Constructor> = None;
    for candidate in ty.constructors() {
        if best.is_some_and(|best| candidate.arity() <= best.arity()) {
            continue;
        }
        if parameters_match(candidate.parameters(), shape, strict) {
            best = Some(candidate);
        }
    }
    best
}

fn parameters_match(parameters: &[ParameterInfo], shape: &[Option<Type>], strict: bool) -> bool {
    if strict && shape.len() > parameters.len() {
        return false;
    }
    parameters.iter().zip(shape).all(|(parameter, value)| {
        let expected = parameter.parameter_type();
        match value {
            None => !expected.is_value(),
            Some(actual) if strict => expected == *actual,
            Some(actual) => expected.is_assignable_from(actual),
        }
    })
}
