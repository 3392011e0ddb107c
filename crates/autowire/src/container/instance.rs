use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::container::descriptor::{AnyArc, Reflect, Type};
use crate::errors::CoreError;

/// A resolved object together with its runtime type.
///
/// Identity is the address of the shared allocation, so an instance and
/// every trait view taken from it compare equal.
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    ty: Type,
    address: usize,
}

impl Instance {
    pub fn new<T: Reflect + Send + Sync>(value: Arc<T>) -> Self {
        let address = Arc::as_ptr(&value) as *const () as usize;
        Self {
            value,
            ty: Type::of::<T>(),
            address,
        }
    }

    /// Wraps an already erased handle such as `Arc<dyn Trait>`.
    pub fn from_handle<T: Reflect + ?Sized + Send + Sync>(handle: Arc<T>) -> Self {
        let address = Arc::as_ptr(&handle) as *const () as usize;
        Self {
            value: Arc::new(handle),
            ty: Type::of::<T>(),
            address,
        }
    }

    pub fn instance_type(&self) -> &Type {
        &self.ty
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.address == other.address
    }

    /// Views the instance as `T`, either its own type or a declared interface.
    pub fn view<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        if let Some(handle) = self.value.downcast_ref::<Arc<T>>() {
            return Some(handle.clone());
        }
        let cast = self.ty.upcast(&self.value, TypeId::of::<T>())?;
        cast.downcast::<Arc<T>>().ok().map(|handle| *handle)
    }

    /// Same as [`Instance::view`] but reports a mismatch as an error.
    pub fn cast<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, CoreError> {
        self.view::<T>().ok_or_else(|| {
            let expected = std::any::type_name::<T>();
            warn!(expected, actual = self.type_name(), "instance cannot be viewed as the requested type");
            CoreError::incompatible_instance(expected, self.type_name())
        })
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            value: Arc::downgrade(&self.value),
            ty: self.ty.clone(),
            address: self.address,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({} @ {:#x})", self.ty, self.address)
    }
}

/// Non-owning reference to an [`Instance`].
#[derive(Clone)]
pub struct WeakInstance {
    value: Weak<dyn Any + Send + Sync>,
    ty: Type,
    address: usize,
}

impl WeakInstance {
    pub(crate) fn new(value: Weak<dyn Any + Send + Sync>, ty: Type) -> Self {
        let address = Weak::as_ptr(&value) as *const () as usize;
        Self { value, ty, address }
    }

    pub fn upgrade(&self) -> Option<Instance> {
        self.value.upgrade().map(|value| Instance {
            value,
            ty: self.ty.clone(),
            address: self.address,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.value.strong_count() > 0
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakInstance({} @ {:#x}, alive: {})", self.ty, self.address, self.is_alive())
    }
}
