use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::container::autowiring::{IntoConstructor, IntoFallibleConstructor, Parameter};
use crate::container::factory::Deferred;
use crate::container::instance::Instance;
use crate::errors::{BoxError, CoreError};

/// Type-erased shared value as stored by the container.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Builds the value of a collection shape from the resolved elements.
pub type CollectFn = fn(Vec<Option<Instance>>) -> Result<Instance, CoreError>;

/// Wraps a deferred resolution into a lazy or factory handle.
pub type DeferFn = fn(Deferred) -> Instance;

type CastFn = Box<dyn Fn(&AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
type InvokeFn = Box<dyn Fn(Vec<Option<Instance>>) -> Result<Instance, BoxError> + Send + Sync>;

/// Describes how a type takes part in resolution.
///
/// Every type the container can see implements this trait once, returning a
/// [`TypeInfo`] that lists its constructors, the interfaces it can be viewed
/// as and its shape.
///
/// ```ignore
/// impl Reflect for Bar {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>()
///             .constructor(|foo: Option<Arc<dyn Foo>>| Bar { foo })
///             .implements::<dyn Service>(|bar| bar)
///             .build()
///     }
/// }
/// ```
pub trait Reflect: 'static {
    fn type_info() -> TypeInfo;
}

/// Shape of a type, deciding which instantiation rule applies to it.
#[derive(Clone)]
pub enum TypeKind {
    /// Concrete type built through its constructors.
    Class,
    /// Abstract type, only resolvable through a mapping.
    Interface,
    /// Non-nullable value type with a default.
    Value,
    /// Nullable text type, absent unless mapped.
    Str,
    /// `Vec<Arc<T>>` of every explicit mapping of the element type.
    Array { element: Type, collect: CollectFn },
    /// Iterable view of every explicit mapping of the element type.
    Sequence { element: Type, collect: CollectFn },
    /// Deferred single resolution of the element type.
    Lazy { element: Type, make: DeferFn },
    /// Callable resolving `result` with positional overrides.
    Factory {
        parameters: Vec<Type>,
        result: Type,
        make: DeferFn,
    },
    /// Open generic definition marker.
    Definition,
}

impl fmt::Debug for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Class => f.write_str("Class"),
            TypeKind::Interface => f.write_str("Interface"),
            TypeKind::Value => f.write_str("Value"),
            TypeKind::Str => f.write_str("Str"),
            TypeKind::Array { element, .. } => write!(f, "Array<{}>", element),
            TypeKind::Sequence { element, .. } => write!(f, "Sequence<{}>", element),
            TypeKind::Lazy { element, .. } => write!(f, "Lazy<{}>", element),
            TypeKind::Factory {
                parameters, result, ..
            } => {
                let names: Vec<&str> = parameters.iter().map(Type::name).collect();
                write!(f, "Factory<({}) -> {}>", names.join(", "), result)
            }
            TypeKind::Definition => f.write_str("Definition"),
        }
    }
}

/// Runtime handle to a reflected type.
///
/// Handles are memoized per `TypeId` so every `Type::of::<T>()` call shares
/// the same descriptor. Equality and hashing use the `TypeId` only.
#[derive(Clone)]
pub struct Type(Arc<TypeInfo>);

impl Type {
    pub fn of<T: Reflect + ?Sized>() -> Self {
        static TYPES: OnceLock<RwLock<HashMap<TypeId, Type>>> = OnceLock::new();

        let types = TYPES.get_or_init(Default::default);
        let id = TypeId::of::<T>();
        if let Some(ty) = types.read().get(&id) {
            return ty.clone();
        }

        // Built outside the lock: descriptors may ask for other types.
        let info = T::type_info();
        debug_assert_eq!(info.id, id, "type_info() must describe {}", type_name::<T>());
        types
            .write()
            .entry(id)
            .or_insert_with(|| Type(Arc::new(info)))
            .clone()
    }

    pub fn id(&self) -> TypeId {
        self.0.id
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn info(&self) -> &TypeInfo {
        &self.0
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.0.constructors
    }

    pub fn generic(&self) -> Option<&GenericInfo> {
        self.0.generic.as_ref()
    }

    /// Default value of a value type, `None` for every other kind.
    pub fn default_instance(&self) -> Option<Instance> {
        self.0.default.map(|make| make())
    }

    /// Fails with a configuration error when the descriptor was built with
    /// an inconsistent declaration.
    pub fn validate(&self) -> Result<(), CoreError> {
        match &self.0.invalid {
            Some(message) => Err(CoreError::configuration(message.clone())),
            None => Ok(()),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.0.kind, TypeKind::Value)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.0.kind, TypeKind::Interface)
    }

    pub fn is_definition(&self) -> bool {
        matches!(self.0.kind, TypeKind::Definition)
    }

    /// Whether `interface` is one of the views this type declares.
    pub fn implements(&self, interface: TypeId) -> bool {
        self.0.upcasts.iter().any(|upcast| upcast.interface == interface)
    }

    /// Whether a value of `other` can stand in for this type.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        self == other || other.implements(self.id())
    }

    pub(crate) fn upcast(&self, value: &AnyArc, interface: TypeId) -> Option<Box<dyn Any + Send + Sync>> {
        self.0
            .upcasts
            .iter()
            .find(|upcast| upcast.interface == interface)
            .and_then(|upcast| (upcast.cast)(value))
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}

/// Identifies a closed generic type by its definition and type arguments.
#[derive(Debug, Clone)]
pub struct GenericInfo {
    definition: Type,
    arguments: Vec<Type>,
}

impl GenericInfo {
    pub fn definition(&self) -> &Type {
        &self.definition
    }

    pub fn arguments(&self) -> &[Type] {
        &self.arguments
    }

    pub(crate) fn argument_ids(&self) -> Vec<TypeId> {
        self.arguments.iter().map(Type::id).collect()
    }
}

struct Upcast {
    interface: TypeId,
    cast: CastFn,
}

/// Descriptor returned by [`Reflect::type_info`].
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
    constructors: Vec<Constructor>,
    upcasts: Vec<Upcast>,
    default: Option<fn() -> Instance>,
    generic: Option<GenericInfo>,
    invalid: Option<String>,
}

impl TypeInfo {
    fn bare<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind,
            constructors: Vec::new(),
            upcasts: Vec::new(),
            default: None,
            generic: None,
            invalid: None,
        }
    }

    /// Concrete type built through its constructors.
    pub fn class<T: Send + Sync + 'static>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(Self::bare::<T>(TypeKind::Class)).identity()
    }

    /// Value type: never absent, resolves to `T::default()` when unmapped.
    pub fn value<T: Reflect + Default + Send + Sync>() -> TypeInfoBuilder<T> {
        let mut info = Self::bare::<T>(TypeKind::Value);
        info.default = Some(|| Instance::new(Arc::new(T::default())));
        TypeInfoBuilder::new(info).identity()
    }

    /// Text type: absent unless mapped.
    pub fn string<T: Send + Sync + 'static>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(Self::bare::<T>(TypeKind::Str)).identity()
    }

    /// Abstract type, usually a `dyn Trait`.
    pub fn interface<T: ?Sized + 'static>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(Self::bare::<T>(TypeKind::Interface))
    }

    /// Marker standing for an open generic definition.
    pub fn definition<T: ?Sized + 'static>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(Self::bare::<T>(TypeKind::Definition))
    }

    /// Built-in shapes such as collections, lazies and factories.
    pub fn shape<T: Send + Sync + 'static>(kind: TypeKind) -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(Self::bare::<T>(kind)).identity()
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("constructors", &self.constructors)
            .field("views", &self.upcasts.len())
            .field("generic", &self.generic)
            .finish()
    }
}

/// Fluent builder for [`TypeInfo`].
pub struct TypeInfoBuilder<T: ?Sized> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> TypeInfoBuilder<T> {
    fn new(info: TypeInfo) -> Self {
        Self {
            info,
            _marker: PhantomData,
        }
    }

    /// Marks this type as the closed form of definition `D`.
    pub fn generic<D: Reflect + ?Sized>(mut self, arguments: Vec<Type>) -> Self {
        self.info.generic = Some(GenericInfo {
            definition: Type::of::<D>(),
            arguments,
        });
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}

impl<T: Send + Sync + 'static> TypeInfoBuilder<T> {
    fn identity(self) -> Self {
        self.implements::<T>(|this| this)
    }

    /// Adds a constructor. Declaration order breaks ties between
    /// constructors of equal arity.
    pub fn constructor<Args, F>(mut self, constructor: F) -> Self
    where
        F: IntoConstructor<T, Args>,
    {
        self.info.constructors.push(constructor.into_constructor());
        self
    }

    /// Adds a constructor that may fail.
    pub fn fallible_constructor<Args, E, F>(mut self, constructor: F) -> Self
    where
        F: IntoFallibleConstructor<T, E, Args>,
    {
        self.info.constructors.push(constructor.into_constructor());
        self
    }

    /// Declares a default for parameter `index` of the last added constructor.
    pub fn default_arg<V: Reflect + Send + Sync>(mut self, index: usize, value: V) -> Self {
        let parameter = self
            .info
            .constructors
            .last_mut()
            .and_then(|constructor| constructor.parameters.get_mut(index));
        match parameter {
            Some(parameter) => parameter.default = Some(Instance::new(Arc::new(value))),
            None => {
                let message = format!("{} has no constructor parameter {} to default", self.info.name, index);
                self.info.invalid.get_or_insert(message);
            }
        }
        self
    }

    /// Declares that this type can be viewed as `I`.
    pub fn implements<I: ?Sized + Send + Sync + 'static>(
        mut self,
        upcast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        let cast = move |value: &AnyArc| -> Option<Box<dyn Any + Send + Sync>> {
            let concrete = match value.clone().downcast::<T>() {
                Ok(concrete) => concrete,
                Err(value) => value.downcast_ref::<Arc<T>>()?.clone(),
            };
            Some(Box::new(upcast(concrete)))
        };
        self.info.upcasts.push(Upcast {
            interface: TypeId::of::<I>(),
            cast: Box::new(cast),
        });
        self
    }
}

/// A way of building one type from resolved parameters.
pub struct Constructor {
    parameters: Vec<ParameterInfo>,
    invoke: InvokeFn,
}

impl Constructor {
    pub(crate) fn new(
        parameters: Vec<ParameterInfo>,
        invoke: impl Fn(Vec<Option<Instance>>) -> Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parameters,
            invoke: Box::new(invoke),
        }
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub(crate) fn invoke(&self, values: Vec<Option<Instance>>) -> Result<Instance, BoxError> {
        (self.invoke)(values)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.parameters).finish()
    }
}

/// Declared type and optional default of one constructor parameter.
pub struct ParameterInfo {
    ty: fn() -> Type,
    name: &'static str,
    default: Option<Instance>,
}

impl ParameterInfo {
    pub fn of<P: Parameter>() -> Self {
        Self {
            ty: P::parameter_type,
            name: type_name::<P>(),
            default: None,
        }
    }

    pub fn parameter_type(&self) -> Type {
        (self.ty)()
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }
}

impl fmt::Debug for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if self.default.is_some() {
            f.write_str(" = <default>")?;
        }
        Ok(())
    }
}
