use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;
use tracing::debug;

use crate::config::ContainerOptions;
use crate::container::activator::Activator;
use crate::container::binding::{Binding, MappingStore};
use crate::container::descriptor::{Reflect, Type, TypeInfo, TypeKind};
use crate::container::factory::FactoryBuilder;
use crate::container::instance::{Instance, WeakInstance};
use crate::container::key::{Arg, TypeKey};
use crate::container::resolver::ResolutionPath;
use crate::errors::CoreError;

/// Object-safe view of a container, for code that receives it as a
/// dependency.
pub trait DependencyResolver: Send + Sync {
    /// Resolve a single instance of `ty` built with `overrides`
    fn resolve(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError>;

    /// Resolve every explicit mapping of `ty`
    fn resolve_all(&self, ty: &Type) -> Result<Vec<Option<Instance>>, CoreError>;

    /// Map `from` to `to`, optionally with default overrides
    fn register_type(&self, from: &Type, to: &Type, overrides: Vec<Arg>) -> Result<(), CoreError>;

    /// Map `ty` to a fixed instance, or to a stored absence
    fn register_instance(&self, ty: &Type, instance: Option<Instance>) -> Result<(), CoreError>;
}

impl dyn DependencyResolver {
    pub fn get<T: Reflect + ?Sized + Send + Sync>(&self) -> Result<Option<Arc<T>>, CoreError> {
        self.get_with::<T>(&[])
    }

    pub fn get_with<T: Reflect + ?Sized + Send + Sync>(&self, overrides: &[Arg]) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve(&Type::of::<T>(), overrides)?
            .map(|instance| instance.cast::<T>())
            .transpose()
    }
}

impl Reflect for dyn DependencyResolver {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

/// Mutable state guarded by the container lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) store: MappingStore,
    pub(crate) path: ResolutionPath,
    pub(crate) closed_generics: HashMap<(TypeId, Vec<TypeId>), Type>,
    pub(crate) depth: usize,
}

/// Constructor-injection container.
///
/// Every operation runs under one reentrant lock, so a constructor may call
/// back into the container (directly, or by forcing a lazy or a factory)
/// on the same thread and share the cycle detection of the outer call.
pub struct Container {
    registry: ReentrantMutex<RefCell<Registry>>,
    options: ContainerOptions,
    frozen: AtomicBool,
    factories: FactoryBuilder,
}

impl Container {
    /// Create a new container with default options
    pub fn new() -> Arc<Self> {
        Self::with_options(ContainerOptions::default())
    }

    /// Create a new container
    ///
    /// The container is mapped to itself as `Container` and as
    /// `dyn DependencyResolver`, without keeping itself alive.
    pub fn with_options(options: ContainerOptions) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Container>| {
            let owner: Weak<dyn Any + Send + Sync> = this.clone();
            let concrete = Type::of::<Container>();
            let mut registry = Registry::default();
            for ty in [concrete.clone(), Type::of::<dyn DependencyResolver>()] {
                let key = TypeKey::new(ty.clone(), Vec::new(), options.comparer.clone());
                let binding = Binding::to_owner(
                    ty,
                    concrete.clone(),
                    WeakInstance::new(owner.clone(), concrete.clone()),
                );
                registry.store.register(key, binding);
            }
            debug!(
                resolve_lazy = options.resolve_lazy,
                resolve_func = options.resolve_func,
                "container created"
            );

            Self {
                registry: ReentrantMutex::new(RefCell::new(registry)),
                options,
                frozen: AtomicBool::new(false),
                factories: FactoryBuilder::new(this.clone()),
            }
        })
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub(crate) fn factories(&self) -> &FactoryBuilder {
        &self.factories
    }

    /// Reject every later mapping. Resolution keeps working.
    pub fn freeze(&self) -> &Self {
        self.frozen.store(true, Ordering::SeqCst);
        debug!("container frozen");
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn ensure_mutable(&self) -> Result<(), CoreError> {
        if self.is_frozen() {
            return Err(CoreError::Frozen);
        }
        Ok(())
    }

    fn with_registry<R>(&self, update: impl FnOnce(&mut Registry) -> R) -> Result<R, CoreError> {
        let guard = self.registry.lock();
        let mut registry = guard
            .try_borrow_mut()
            .map_err(|_| CoreError::lock_error("container registry"))?;
        Ok(update(&mut registry))
    }

    fn activate<R>(&self, call: impl FnOnce(&Activator<'_>) -> Result<R, CoreError>) -> Result<R, CoreError> {
        let guard = self.registry.lock();
        let activator = Activator::begin(self, &guard)?;
        call(&activator)
    }

    fn key(&self, ty: &Type, args: Vec<Arg>) -> TypeKey {
        TypeKey::new(ty.clone(), args, self.options.comparer.clone())
    }

    /// Map `From` to `To`: resolving `From` resolves `To`.
    pub fn map<From: Reflect + ?Sized, To: Reflect + ?Sized>(&self) -> Result<&Self, CoreError> {
        self.map_type(&Type::of::<From>(), &Type::of::<To>(), Vec::new())?;
        Ok(self)
    }

    /// Map `From` to `To`, building `To` with default overrides.
    pub fn map_with<From: Reflect + ?Sized, To: Reflect + ?Sized>(
        &self,
        overrides: Vec<Arg>,
    ) -> Result<&Self, CoreError> {
        self.map_type(&Type::of::<From>(), &Type::of::<To>(), overrides)?;
        Ok(self)
    }

    /// Map `I` to a fixed instance. The instance is also reachable as `C`.
    pub fn map_instance<I: Reflect + ?Sized, C: Reflect + Send + Sync>(&self, instance: Arc<C>) -> Result<&Self, CoreError> {
        self.map_instance_dyn(&Type::of::<I>(), Some(Instance::new(instance)))?;
        Ok(self)
    }

    /// Map an erased handle such as `Arc<dyn Trait>` under its own type.
    pub fn map_shared<T: Reflect + ?Sized + Send + Sync>(&self, handle: Arc<T>) -> Result<&Self, CoreError> {
        self.map_instance_dyn(&Type::of::<T>(), Some(Instance::from_handle(handle)))?;
        Ok(self)
    }

    pub fn map_value<T: Reflect + Send + Sync>(&self, value: T) -> Result<&Self, CoreError> {
        self.map_instance::<T, T>(Arc::new(value))
    }

    /// Map `T` to a stored absence.
    pub fn map_none<T: Reflect + ?Sized>(&self) -> Result<&Self, CoreError> {
        self.map_instance_dyn(&Type::of::<T>(), None)?;
        Ok(self)
    }

    pub fn map_type(&self, from: &Type, to: &Type, overrides: Vec<Arg>) -> Result<(), CoreError> {
        self.ensure_mutable()?;
        check_mapping(from, to)?;
        to.validate()?;
        self.declare_type(from)?;
        self.declare_type(to)?;

        self.with_registry(|registry| {
            if !overrides.is_empty() {
                registry.store.register(
                    self.key(from, overrides.clone()),
                    Binding::to_type(from.clone(), to.clone(), overrides.clone()),
                );
            }
            registry
                .store
                .register(self.key(from, Vec::new()), Binding::to_type(from.clone(), to.clone(), overrides));
        })?;
        debug!(from = from.name(), to = to.name(), "mapped type");
        Ok(())
    }

    pub fn map_instance_dyn(&self, ty: &Type, instance: Option<Instance>) -> Result<(), CoreError> {
        self.ensure_mutable()?;
        if let Some(instance) = &instance {
            if !ty.is_assignable_from(instance.instance_type()) {
                return Err(CoreError::incompatible_mapping(ty.name(), instance.type_name()));
            }
        }

        self.with_registry(|registry| {
            registry
                .store
                .register(self.key(ty, Vec::new()), Binding::to_instance(ty.clone(), instance.clone()));
            if let Some(instance) = instance.filter(|instance| instance.instance_type() != ty) {
                let concrete = instance.instance_type().clone();
                registry
                    .store
                    .register(self.key(&concrete, Vec::new()), Binding::to_instance(concrete, Some(instance)));
            }
        })?;
        debug!(type_name = ty.name(), "mapped instance");
        Ok(())
    }

    /// Make a closed generic type available for definition substitution.
    pub fn declare<T: Reflect + ?Sized>(&self) -> Result<&Self, CoreError> {
        self.declare_type(&Type::of::<T>())?;
        Ok(self)
    }

    pub fn declare_type(&self, ty: &Type) -> Result<(), CoreError> {
        let Some(generic) = ty.generic() else {
            return Ok(());
        };
        let key = (generic.definition().id(), generic.argument_ids());
        self.with_registry(|registry| {
            registry.closed_generics.entry(key).or_insert_with(|| ty.clone());
        })
    }

    /// Resolve a single instance of `T`.
    pub fn get<T: Reflect + ?Sized + Send + Sync>(&self) -> Result<Option<Arc<T>>, CoreError> {
        self.get_with::<T>(&[])
    }

    /// Resolve `T` with positional constructor overrides.
    pub fn get_with<T: Reflect + ?Sized + Send + Sync>(&self, overrides: &[Arg]) -> Result<Option<Arc<T>>, CoreError> {
        self.get_dyn(&Type::of::<T>(), overrides)?
            .map(|instance| instance.cast::<T>())
            .transpose()
    }

    pub fn get_dyn(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError> {
        self.declare_type(ty)?;
        self.activate(|activator| activator.get(ty, overrides))
    }

    /// Resolve every explicit mapping of `T`, skipping absent ones.
    pub fn get_all<T: Reflect + ?Sized + Send + Sync>(&self) -> Result<Vec<Arc<T>>, CoreError> {
        self.get_all_dyn(&Type::of::<T>())?
            .into_iter()
            .flatten()
            .map(|instance| instance.cast::<T>())
            .collect()
    }

    /// One entry per explicit mapping of `ty`, absent ones included.
    pub fn get_all_dyn(&self, ty: &Type) -> Result<Vec<Option<Instance>>, CoreError> {
        self.activate(|activator| activator.get_all(ty))
    }

    /// Every binding that has a target type, in registration order.
    pub fn mappings(&self) -> Result<Vec<Binding>, CoreError> {
        self.with_registry(|registry| {
            registry
                .store
                .bindings()
                .filter(|binding| binding.target().is_some())
                .cloned()
                .collect()
        })
    }

    /// Every live instance the container references, once each, excluding
    /// the container itself.
    pub fn instances(&self) -> Result<Vec<Instance>, CoreError> {
        let own_address = self as *const Self as *const () as usize;
        self.with_registry(|registry| {
            let mut seen = HashSet::new();
            registry
                .store
                .bindings()
                .filter_map(|binding| binding.value().flatten())
                .filter(|instance| instance.address() != own_address && seen.insert(instance.address()))
                .collect()
        })
    }
}

fn check_mapping(from: &Type, to: &Type) -> Result<(), CoreError> {
    let compatible = match (from.kind(), to.kind()) {
        (TypeKind::Definition, TypeKind::Definition) => true,
        (TypeKind::Interface, TypeKind::Interface) => true,
        _ => from.is_assignable_from(to),
    };
    if compatible {
        Ok(())
    } else {
        Err(CoreError::incompatible_mapping(from.name(), to.name()))
    }
}

impl DependencyResolver for Container {
    fn resolve(&self, ty: &Type, overrides: &[Arg]) -> Result<Option<Instance>, CoreError> {
        self.get_dyn(ty, overrides)
    }

    fn resolve_all(&self, ty: &Type) -> Result<Vec<Option<Instance>>, CoreError> {
        self.get_all_dyn(ty)
    }

    fn register_type(&self, from: &Type, to: &Type, overrides: Vec<Arg>) -> Result<(), CoreError> {
        self.map_type(from, to, overrides)
    }

    fn register_instance(&self, ty: &Type, instance: Option<Instance>) -> Result<(), CoreError> {
        self.map_instance_dyn(ty, instance)
    }
}

impl Reflect for Container {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .implements::<dyn DependencyResolver>(|container| container)
            .build()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("options", &self.options)
            .field("frozen", &self.is_frozen())
            .finish_non_exhaustive()
    }
}
