use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};

use tracing::warn;

use crate::container::autowiring::{required, Parameter};
use crate::container::descriptor::{Reflect, Type, TypeInfo, TypeKind};
use crate::container::instance::Instance;
use crate::container::ioc_container::Container;
use crate::container::key::Arg;
use crate::errors::CoreError;

/// A resolution postponed until called, with positional overrides.
pub type Deferred = Arc<dyn Fn(Vec<Arg>) -> Result<Option<Instance>, CoreError> + Send + Sync>;

/// Produces deferred resolutions bound to one container.
///
/// Holds the container weakly: lazies and factories stored inside the
/// container's own cache must not keep it alive.
#[derive(Clone)]
pub(crate) struct FactoryBuilder {
    container: Weak<Container>,
}

impl FactoryBuilder {
    pub(crate) fn new(container: Weak<Container>) -> Self {
        Self { container }
    }

    pub(crate) fn deferred(&self, target: Type) -> Deferred {
        let container = self.container.clone();
        Arc::new(move |arguments: Vec<Arg>| match container.upgrade() {
            Some(container) => container.get_dyn(&target, &arguments),
            None => {
                warn!(target_type = %target, "deferred resolution after the container was dropped");
                Ok(None)
            }
        })
    }
}

macro_rules! shape_definitions {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub enum $name {}

            impl Reflect for $name {
                fn type_info() -> TypeInfo {
                    TypeInfo::definition::<Self>().build()
                }
            }
        )*
    };
}

shape_definitions!(
    /// Open definition of [`Lazy`].
    LazyDefinition,
    /// Open definition of [`Many`].
    SequenceDefinition,
    /// Open definition of `Vec<Arc<T>>`.
    ArrayDefinition,
    /// Open definition of [`Func`]; its arguments are the parameter types
    /// followed by the result type.
    FuncDefinition,
);

fn resolve_as<T: ?Sized + Send + Sync + 'static>(
    value: Option<Instance>,
) -> Result<Option<Arc<T>>, CoreError> {
    value.map(|instance| instance.cast::<T>()).transpose()
}

/// Single resolution of `T`, performed on first use and cached.
pub struct Lazy<T: ?Sized> {
    deferred: Deferred,
    value: OnceLock<Option<Arc<T>>>,
}

impl<T: Reflect + ?Sized + Send + Sync> Lazy<T> {
    /// Lazy backed by a user closure instead of a container.
    pub fn new(init: impl Fn() -> Option<Arc<T>> + Send + Sync + 'static) -> Self {
        Self::from_deferred(Arc::new(move |_: Vec<Arg>| Ok(init().map(Instance::from_handle))))
    }

    pub(crate) fn from_deferred(deferred: Deferred) -> Self {
        Self {
            deferred,
            value: OnceLock::new(),
        }
    }

    /// Resolve on first call; later calls return the same value.
    pub fn value(&self) -> Result<Option<Arc<T>>, CoreError> {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        let resolved = resolve_as::<T>((self.deferred)(Vec::new())?)?;
        Ok(self.value.get_or_init(|| resolved).clone())
    }

    pub fn is_value_created(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: ?Sized> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("created", &self.value.get().is_some())
            .finish()
    }
}

impl<T: Reflect + ?Sized + Send + Sync> Reflect for Lazy<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::shape::<Self>(TypeKind::Lazy {
            element: Type::of::<T>(),
            make: |deferred| Instance::new(Arc::new(Lazy::<T>::from_deferred(deferred))),
        })
        .generic::<LazyDefinition>(vec![Type::of::<T>()])
        .build()
    }
}

impl<T: Reflect + ?Sized + Send + Sync> Parameter for Lazy<T> {
    fn parameter_type() -> Type {
        Type::of::<Self>()
    }

    fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
        required::<Self>(value, index).map(|lazy| (*lazy).clone())
    }

    fn into_argument(self) -> Arg {
        Arg::instance(Instance::new(Arc::new(self)))
    }
}

/// Every explicit mapping of `T`, in registration order.
pub struct Many<T: ?Sized> {
    items: Vec<Arc<T>>,
}

impl<T: ?Sized> Many<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.items.clone()
    }
}

impl<T: ?Sized> From<Vec<Arc<T>>> for Many<T> {
    fn from(items: Vec<Arc<T>>) -> Self {
        Self { items }
    }
}

impl<T: ?Sized> Clone for Many<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Many<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Many").field("len", &self.items.len()).finish()
    }
}

impl<'a, T: ?Sized> IntoIterator for &'a Many<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ?Sized> IntoIterator for Many<T> {
    type Item = Arc<T>;
    type IntoIter = std::vec::IntoIter<Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn collect_items<T: ?Sized + Send + Sync + 'static>(
    items: Vec<Option<Instance>>,
) -> Result<Vec<Arc<T>>, CoreError> {
    items.into_iter().flatten().map(|instance| instance.cast::<T>()).collect()
}

fn collect_vec<T: Reflect + ?Sized + Send + Sync>(items: Vec<Option<Instance>>) -> Result<Instance, CoreError> {
    Ok(Instance::new(Arc::new(collect_items::<T>(items)?)))
}

fn collect_many<T: Reflect + ?Sized + Send + Sync>(items: Vec<Option<Instance>>) -> Result<Instance, CoreError> {
    let items = collect_items::<T>(items)?;
    Ok(Instance::new(Arc::new(Many { items })))
}

impl<T: Reflect + ?Sized + Send + Sync> Reflect for Many<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::shape::<Self>(TypeKind::Sequence {
            element: Type::of::<T>(),
            collect: collect_many::<T>,
        })
        .generic::<SequenceDefinition>(vec![Type::of::<T>()])
        .build()
    }
}

impl<T: Reflect + ?Sized + Send + Sync> Parameter for Many<T> {
    fn parameter_type() -> Type {
        Type::of::<Self>()
    }

    fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
        required::<Self>(value, index).map(|many| (*many).clone())
    }

    fn into_argument(self) -> Arg {
        Arg::instance(Instance::new(Arc::new(self)))
    }
}

impl<T: Reflect + ?Sized + Send + Sync> Reflect for Vec<Arc<T>> {
    fn type_info() -> TypeInfo {
        TypeInfo::shape::<Self>(TypeKind::Array {
            element: Type::of::<T>(),
            collect: collect_vec::<T>,
        })
        .generic::<ArrayDefinition>(vec![Type::of::<T>()])
        .build()
    }
}

impl<T: Reflect + ?Sized + Send + Sync> Parameter for Vec<Arc<T>> {
    fn parameter_type() -> Type {
        Type::of::<Self>()
    }

    fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
        required::<Self>(value, index).map(|items| (*items).clone())
    }

    fn into_argument(self) -> Arg {
        Arg::instance(Instance::new(Arc::new(self)))
    }
}

/// Callable that resolves `R` with its arguments as positional overrides.
///
/// `Args` is a tuple of up to seven parameter types; `Func<(), R>` takes
/// none.
pub struct Func<Args, R: ?Sized> {
    deferred: Deferred,
    _marker: PhantomData<fn(Args) -> Box<R>>,
}

impl<Args, R: ?Sized> Func<Args, R> {
    /// Factory backed by a user closure receiving the overrides.
    pub fn from_fn(
        resolve: impl Fn(Vec<Arg>) -> Result<Option<Instance>, CoreError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_deferred(Arc::new(resolve))
    }

    pub(crate) fn from_deferred(deferred: Deferred) -> Self {
        Self {
            deferred,
            _marker: PhantomData,
        }
    }
}

impl<R: Reflect + ?Sized + Send + Sync> Func<(), R> {
    /// Argument-less factory returning whatever `produce` yields.
    pub fn returning(produce: impl Fn() -> Option<Arc<R>> + Send + Sync + 'static) -> Self {
        Self::from_fn(move |_: Vec<Arg>| Ok(produce().map(Instance::from_handle)))
    }
}

impl<Args, R: ?Sized> Clone for Func<Args, R> {
    fn clone(&self) -> Self {
        Self::from_deferred(self.deferred.clone())
    }
}

impl<Args, R: ?Sized> fmt::Debug for Func<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func<{}>", std::any::type_name::<R>())
    }
}

macro_rules! impl_func {
    ($($param:ident $arg:ident),*) => {
        impl<R, $($param,)*> Func<($($param,)*), R>
        where
            R: Reflect + ?Sized + Send + Sync,
            $($param: Parameter,)*
        {
            pub fn call(&self, $($arg: $param),*) -> Result<Option<Arc<R>>, CoreError> {
                let arguments = vec![$(<$param as Parameter>::into_argument($arg)),*];
                resolve_as::<R>((self.deferred)(arguments)?)
            }
        }

        impl<R, $($param,)*> Reflect for Func<($($param,)*), R>
        where
            R: Reflect + ?Sized + Send + Sync,
            $($param: Parameter,)*
        {
            fn type_info() -> TypeInfo {
                let parameters = vec![$(<$param as Parameter>::parameter_type()),*];
                let mut arguments = parameters.clone();
                arguments.push(Type::of::<R>());
                TypeInfo::shape::<Self>(TypeKind::Factory {
                    parameters,
                    result: Type::of::<R>(),
                    make: |deferred| Instance::new(Arc::new(Self::from_deferred(deferred))),
                })
                .generic::<FuncDefinition>(arguments)
                .build()
            }
        }

        impl<R, $($param,)*> Parameter for Func<($($param,)*), R>
        where
            R: Reflect + ?Sized + Send + Sync,
            $($param: Parameter,)*
        {
            fn parameter_type() -> Type {
                Type::of::<Self>()
            }

            fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
                required::<Self>(value, index).map(|func| (*func).clone())
            }

            fn into_argument(self) -> Arg {
                Arg::instance(Instance::new(Arc::new(self)))
            }
        }
    };
}

impl_func!();
impl_func!(A1 a1);
impl_func!(A1 a1, A2 a2);
impl_func!(A1 a1, A2 a2, A3 a3);
impl_func!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_func!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_func!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_func!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
