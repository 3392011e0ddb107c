use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::container::descriptor::{Reflect, Type};
use crate::container::instance::Instance;

/// Value carried by an [`Arg`] and compared structurally.
pub trait ArgData: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn data_type(&self) -> Type;
    fn data_eq(&self, other: &dyn ArgData) -> bool;
    fn data_hash(&self, state: &mut dyn Hasher);
    fn into_instance(self: Arc<Self>) -> Instance;
}

impl<T> ArgData for T
where
    T: Reflect + PartialEq + Hash + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_type(&self) -> Type {
        Type::of::<T>()
    }

    fn data_eq(&self, other: &dyn ArgData) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn data_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn into_instance(self: Arc<Self>) -> Instance {
        Instance::new(self)
    }
}

#[derive(Clone)]
enum ArgRepr {
    Null,
    Value(Arc<dyn ArgData>),
    Shared(Instance),
}

/// Positional constructor override.
///
/// Plain values compare by value, shared objects by identity and `null`
/// only equals `null`.
#[derive(Clone)]
pub struct Arg(ArgRepr);

impl Arg {
    pub fn null() -> Self {
        Self(ArgRepr::Null)
    }

    pub fn value<T>(value: T) -> Self
    where
        T: Reflect + PartialEq + Hash + fmt::Debug + Send + Sync,
    {
        Self(ArgRepr::Value(Arc::new(value)))
    }

    pub fn instance(instance: Instance) -> Self {
        Self(ArgRepr::Shared(instance))
    }

    pub fn shared<T: Reflect + ?Sized + Send + Sync>(handle: Arc<T>) -> Self {
        Self::instance(Instance::from_handle(handle))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0, ArgRepr::Null)
    }

    /// Runtime type of the argument, `None` for `null`.
    pub fn arg_type(&self) -> Option<Type> {
        match &self.0 {
            ArgRepr::Null => None,
            ArgRepr::Value(data) => Some(data.data_type()),
            ArgRepr::Shared(instance) => Some(instance.instance_type().clone()),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.0 {
            ArgRepr::Null => None,
            ArgRepr::Value(data) => data.as_any().downcast_ref::<T>(),
            ArgRepr::Shared(instance) => instance.downcast_ref::<T>(),
        }
    }

    pub(crate) fn to_instance(&self) -> Option<Instance> {
        match &self.0 {
            ArgRepr::Null => None,
            ArgRepr::Value(data) => Some(data.clone().into_instance()),
            ArgRepr::Shared(instance) => Some(instance.clone()),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ArgRepr::Null, ArgRepr::Null) => true,
            (ArgRepr::Value(left), ArgRepr::Value(right)) => left.data_eq(&**right),
            (ArgRepr::Shared(left), ArgRepr::Shared(right)) => left.ptr_eq(right),
            _ => false,
        }
    }
}

impl Eq for Arg {}

impl Hash for Arg {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            ArgRepr::Null => 0u8.hash(state),
            ArgRepr::Value(data) => {
                1u8.hash(state);
                let hasher: &mut dyn Hasher = state;
                data.data_hash(hasher);
            }
            ArgRepr::Shared(instance) => {
                2u8.hash(state);
                instance.address().hash(state);
            }
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ArgRepr::Null => f.write_str("null"),
            ArgRepr::Value(data) => fmt::Debug::fmt(data, f),
            ArgRepr::Shared(instance) => fmt::Debug::fmt(instance, f),
        }
    }
}

/// Conversion used by the [`args!`](crate::args) macro.
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Arg {
        Arg::value(self.to_string())
    }
}

impl<T: Reflect + ?Sized + Send + Sync> IntoArg for Arc<T> {
    fn into_arg(self) -> Arg {
        Arg::shared(self)
    }
}

macro_rules! value_args {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArg for $ty {
                fn into_arg(self) -> Arg {
                    Arg::value(self)
                }
            }
        )*
    };
}

value_args!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, String);

/// Float override, compared and hashed by bit pattern.
struct Float<F>(F);

impl<F: fmt::Debug> fmt::Debug for Float<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

macro_rules! float_args {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ArgData for Float<$ty> {
                fn as_any(&self) -> &dyn Any {
                    &self.0
                }

                fn data_type(&self) -> Type {
                    Type::of::<$ty>()
                }

                fn data_eq(&self, other: &dyn ArgData) -> bool {
                    other
                        .as_any()
                        .downcast_ref::<$ty>()
                        .is_some_and(|other| self.0.to_bits() == other.to_bits())
                }

                fn data_hash(&self, mut state: &mut dyn Hasher) {
                    TypeId::of::<$ty>().hash(&mut state);
                    self.0.to_bits().hash(&mut state);
                }

                fn into_instance(self: Arc<Self>) -> Instance {
                    Instance::new(Arc::new(self.0))
                }
            }

            impl IntoArg for $ty {
                fn into_arg(self) -> Arg {
                    Arg(ArgRepr::Value(Arc::new(Float(self))))
                }
            }
        )*
    };
}

float_args!(f32, f64);

/// Builds a `Vec<Arg>` of positional overrides.
///
/// ```ignore
/// container.get_with::<Report>(&args![42, "title", Arg::null()])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoArg::into_arg($value)),+]
    };
}

/// Equality strategy for override lists.
pub trait ArgComparer: Send + Sync {
    fn equals(&self, left: &Arg, right: &Arg) -> bool;
    fn hash(&self, arg: &Arg, state: &mut dyn Hasher);
}

/// Lookup key of the mapping store: a type plus its positional overrides.
#[derive(Clone)]
pub struct TypeKey {
    ty: Type,
    args: Vec<Arg>,
    comparer: Option<Arc<dyn ArgComparer>>,
}

impl TypeKey {
    pub fn new(ty: Type, args: Vec<Arg>, comparer: Option<Arc<dyn ArgComparer>>) -> Self {
        Self { ty, args, comparer }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    fn args_eq(&self, left: &Arg, right: &Arg) -> bool {
        match &self.comparer {
            Some(comparer) => comparer.equals(left, right),
            None => left == right,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(left, right)| self.args_eq(left, right))
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.args.len().hash(state);
        for arg in &self.args {
            match &self.comparer {
                Some(comparer) => {
                    let hasher: &mut dyn Hasher = &mut *state;
                    comparer.hash(arg, hasher);
                }
                None => arg.hash(state),
            }
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{}{:?}", self.ty, self.args)
        }
    }
}
