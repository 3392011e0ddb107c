use std::any::type_name;
use std::sync::Arc;

use crate::container::descriptor::{Constructor, ParameterInfo, Reflect, Type, TypeInfo};
use crate::container::instance::Instance;
use crate::container::key::{Arg, IntoArg};
use crate::errors::{BoxError, CoreError};

/// Helper trait for extracting constructor parameters
///
/// A parameter names the type the container resolves for it and converts
/// the resolved instance back into the Rust value the constructor takes.
pub trait Parameter: Sized + Send + Sync + 'static {
    /// Type the container resolves for this parameter
    fn parameter_type() -> Type;

    /// Convert the resolved (or overridden) instance at position `index`
    fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError>;

    /// Convert a value passed to a factory back into an override
    fn into_argument(self) -> Arg;
}

pub(crate) fn required<T: ?Sized + Send + Sync + 'static>(
    value: Option<Instance>,
    index: usize,
) -> Result<Arc<T>, CoreError> {
    value
        .ok_or_else(|| CoreError::missing_dependency(type_name::<T>(), index))?
        .cast::<T>()
}

/// Implementation for Arc<T> parameters, including `Arc<dyn Trait>`
impl<T: Reflect + ?Sized + Send + Sync> Parameter for Arc<T> {
    fn parameter_type() -> Type {
        Type::of::<T>()
    }

    fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
        required::<T>(value, index)
    }

    fn into_argument(self) -> Arg {
        Arg::shared(self)
    }
}

/// Implementation for Option<Arc<T>> parameters (optional dependencies)
impl<T: Reflect + ?Sized + Send + Sync> Parameter for Option<Arc<T>> {
    fn parameter_type() -> Type {
        Type::of::<T>()
    }

    fn from_resolved(value: Option<Instance>, _index: usize) -> Result<Self, CoreError> {
        value.map(|instance| instance.cast::<T>()).transpose()
    }

    fn into_argument(self) -> Arg {
        self.map(Arg::shared).unwrap_or_else(Arg::null)
    }
}

macro_rules! reflect_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::value::<$ty>().build()
                }
            }
        )*
    };
}

macro_rules! plain_parameters {
    ($to_arg:path => $($ty:ty),* $(,)?) => {
        $(
            impl Parameter for $ty {
                fn parameter_type() -> Type {
                    Type::of::<$ty>()
                }

                fn from_resolved(value: Option<Instance>, index: usize) -> Result<Self, CoreError> {
                    required::<$ty>(value, index).map(|value| (*value).clone())
                }

                fn into_argument(self) -> Arg {
                    $to_arg(self)
                }
            }

            impl Parameter for Option<$ty> {
                fn parameter_type() -> Type {
                    Type::of::<$ty>()
                }

                fn from_resolved(value: Option<Instance>, _index: usize) -> Result<Self, CoreError> {
                    value
                        .map(|instance| instance.cast::<$ty>().map(|value| (*value).clone()))
                        .transpose()
                }

                fn into_argument(self) -> Arg {
                    self.map($to_arg).unwrap_or_else(Arg::null)
                }
            }
        )*
    };
}

reflect_values!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, f32, f64);

impl Reflect for String {
    fn type_info() -> TypeInfo {
        TypeInfo::string::<String>().build()
    }
}

plain_parameters!(Arg::value => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, String);
plain_parameters!(IntoArg::into_arg => f32, f64);

/// Conversion of a closure into a [`Constructor`].
pub trait IntoConstructor<T, Args>: Send + Sync + 'static {
    fn into_constructor(self) -> Constructor;
}

/// Conversion of a closure returning `Result` into a [`Constructor`].
pub trait IntoFallibleConstructor<T, E, Args>: Send + Sync + 'static {
    fn into_constructor(self) -> Constructor;
}

macro_rules! impl_into_constructor {
    ($($param:ident),*) => {
        impl<T, F, $($param,)*> IntoConstructor<T, ($($param,)*)> for F
        where
            T: Reflect + Send + Sync,
            F: Fn($($param),*) -> T + Send + Sync + 'static,
            $($param: Parameter,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn into_constructor(self) -> Constructor {
                Constructor::new(
                    vec![$(ParameterInfo::of::<$param>()),*],
                    move |values: Vec<Option<Instance>>| -> Result<Instance, BoxError> {
                        let mut values = values.into_iter();
                        let mut index = 0usize;
                        $(
                            let $param = <$param as Parameter>::from_resolved(values.next().flatten(), index)?;
                            index += 1;
                        )*
                        Ok(Instance::new(Arc::new((self)($($param),*))))
                    },
                )
            }
        }

        impl<T, E, F, $($param,)*> IntoFallibleConstructor<T, E, ($($param,)*)> for F
        where
            T: Reflect + Send + Sync,
            E: Into<BoxError>,
            F: Fn($($param),*) -> Result<T, E> + Send + Sync + 'static,
            $($param: Parameter,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn into_constructor(self) -> Constructor {
                Constructor::new(
                    vec![$(ParameterInfo::of::<$param>()),*],
                    move |values: Vec<Option<Instance>>| -> Result<Instance, BoxError> {
                        let mut values = values.into_iter();
                        let mut index = 0usize;
                        $(
                            let $param = <$param as Parameter>::from_resolved(values.next().flatten(), index)?;
                            index += 1;
                        )*
                        let value = (self)($($param),*).map_err(Into::<BoxError>::into)?;
                        Ok(Instance::new(Arc::new(value)))
                    },
                )
            }
        }
    };
}

impl_into_constructor!();
impl_into_constructor!(A1);
impl_into_constructor!(A1, A2);
impl_into_constructor!(A1, A2, A3);
impl_into_constructor!(A1, A2, A3, A4);
impl_into_constructor!(A1, A2, A3, A4, A5);
impl_into_constructor!(A1, A2, A3, A4, A5, A6);
impl_into_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_into_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
