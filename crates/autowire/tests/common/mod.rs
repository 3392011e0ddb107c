//! Shared fixture types for the container integration tests

#![allow(dead_code)]

use std::any::type_name;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use autowire::{Arg, ArgComparer, CoreError, Func, Lazy, Many, Reflect, Type, TypeInfo};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Whether two handles point at the same object, whatever their static type.
pub fn same<T: ?Sized, U: ?Sized>(left: &Arc<T>, right: &Arc<U>) -> bool {
    Arc::as_ptr(left) as *const () == Arc::as_ptr(right) as *const ()
}

// Interfaces

pub trait IFoo: Send + Sync {
    fn name(&self) -> &'static str;
}

pub trait IBar: Send + Sync {}

impl Reflect for dyn IFoo {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

impl Reflect for dyn IBar {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

// Plain implementations

pub struct Foo;

impl IFoo for Foo {
    fn name(&self) -> &'static str {
        "Foo"
    }
}

impl Reflect for Foo {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| Foo)
            .implements::<dyn IFoo>(|foo| foo)
            .build()
    }
}

pub struct Foo2;

impl IFoo for Foo2 {
    fn name(&self) -> &'static str {
        "Foo2"
    }
}

impl Reflect for Foo2 {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| Foo2)
            .implements::<dyn IFoo>(|foo| foo)
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct StructFoo {
    pub value: i32,
}

impl IFoo for StructFoo {
    fn name(&self) -> &'static str {
        "StructFoo"
    }
}

impl Reflect for StructFoo {
    fn type_info() -> TypeInfo {
        TypeInfo::value::<Self>()
            .implements::<dyn IFoo>(|foo| foo)
            .build()
    }
}

pub struct Bar {
    pub foo: Option<Arc<dyn IFoo>>,
}

impl IBar for Bar {}

impl Reflect for Bar {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|foo: Option<Arc<dyn IFoo>>| Bar { foo })
            .implements::<dyn IBar>(|bar| bar)
            .build()
    }
}

pub struct FooBar;

impl IFoo for FooBar {
    fn name(&self) -> &'static str {
        "FooBar"
    }
}

impl IBar for FooBar {}

impl Reflect for FooBar {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| FooBar)
            .implements::<dyn IFoo>(|foo_bar| foo_bar)
            .implements::<dyn IBar>(|foo_bar| foo_bar)
            .build()
    }
}

/// Has no constructor at all.
pub struct Unconstructible;

impl Reflect for Unconstructible {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().build()
    }
}

// Constructor selection

pub struct ConstructorWithDefaultParameter {
    pub int_value: i32,
    pub string_value: Option<String>,
    pub bar: Option<Arc<Bar>>,
}

impl Reflect for ConstructorWithDefaultParameter {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|int_value: i32, string_value: Option<String>, bar: Option<Arc<Bar>>| {
                ConstructorWithDefaultParameter {
                    int_value,
                    string_value,
                    bar,
                }
            })
            .default_arg(0, 1i32)
            .default_arg(1, "default".to_string())
            .build()
    }
}

pub struct ConstructorWithDefaultStructParameter {
    pub foo: Arc<StructFoo>,
}

impl Reflect for ConstructorWithDefaultStructParameter {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|foo: Arc<StructFoo>| ConstructorWithDefaultStructParameter { foo })
            .default_arg(0, StructFoo { value: 5 })
            .build()
    }
}

pub struct ConstructorWithPrimitives {
    pub int_value: i32,
    pub float_value: f64,
    pub flag: bool,
    pub text: Option<String>,
}

impl Reflect for ConstructorWithPrimitives {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|int_value: i32, float_value: f64, flag: bool, text: Option<String>| {
                ConstructorWithPrimitives {
                    int_value,
                    float_value,
                    flag,
                    text,
                }
            })
            .build()
    }
}

/// Records which overload built it.
pub struct ConstructorWithOverloads {
    pub used: usize,
    pub foo: Option<Arc<dyn IFoo>>,
    pub bar: Option<Arc<dyn IBar>>,
}

impl Reflect for ConstructorWithOverloads {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| ConstructorWithOverloads {
                used: 0,
                foo: None,
                bar: None,
            })
            .constructor(|foo: Arc<dyn IFoo>| ConstructorWithOverloads {
                used: 1,
                foo: Some(foo),
                bar: None,
            })
            .constructor(|foo: Arc<dyn IFoo>, bar: Arc<dyn IBar>| ConstructorWithOverloads {
                used: 2,
                foo: Some(foo),
                bar: Some(bar),
            })
            .build()
    }
}

pub struct Exploding;

impl Reflect for Exploding {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .fallible_constructor(|| -> Result<Exploding, CoreError> { Err(CoreError::configuration("boom")) })
            .build()
    }
}

pub struct DependsOnExploding {
    pub foo: Arc<Foo>,
    pub exploding: Arc<Exploding>,
}

impl Reflect for DependsOnExploding {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|foo: Arc<Foo>, exploding: Arc<Exploding>| DependsOnExploding { foo, exploding })
            .build()
    }
}

// Collections

pub struct ArrayConstructor {
    pub foo: Arc<dyn IFoo>,
    pub foos: Vec<Arc<dyn IFoo>>,
}

impl Reflect for ArrayConstructor {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|foo: Arc<dyn IFoo>, foos: Vec<Arc<dyn IFoo>>| ArrayConstructor { foo, foos })
            .build()
    }
}

pub struct EnumerableConstructor {
    pub foo: Arc<dyn IFoo>,
    pub foos: Many<dyn IFoo>,
}

impl Reflect for EnumerableConstructor {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|foo: Arc<dyn IFoo>, foos: Many<dyn IFoo>| EnumerableConstructor { foo, foos })
            .build()
    }
}

// Cycles

pub trait IPing: Send + Sync {
    fn pong(&self) -> Option<Arc<dyn IPong>>;
}

pub trait IPong: Send + Sync {
    fn ping(&self) -> Option<Arc<dyn IPing>>;
}

impl Reflect for dyn IPing {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

impl Reflect for dyn IPong {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

pub struct Ping {
    pub pong: Option<Arc<dyn IPong>>,
}

impl IPing for Ping {
    fn pong(&self) -> Option<Arc<dyn IPong>> {
        self.pong.clone()
    }
}

impl Reflect for Ping {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|pong: Option<Arc<dyn IPong>>| Ping { pong })
            .implements::<dyn IPing>(|ping| ping)
            .build()
    }
}

pub struct Pong {
    pub ping: Option<Arc<dyn IPing>>,
}

impl IPong for Pong {
    fn ping(&self) -> Option<Arc<dyn IPing>> {
        self.ping.clone()
    }
}

impl Reflect for Pong {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|ping: Option<Arc<dyn IPing>>| Pong { ping })
            .implements::<dyn IPong>(|pong| pong)
            .build()
    }
}

pub struct PongLazy {
    pub ping: Lazy<dyn IPing>,
}

impl IPong for PongLazy {
    fn ping(&self) -> Option<Arc<dyn IPing>> {
        self.ping.value().ok().flatten()
    }
}

impl Reflect for PongLazy {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|ping: Lazy<dyn IPing>| PongLazy { ping })
            .implements::<dyn IPong>(|pong| pong)
            .build()
    }
}

pub struct PongFunc {
    pub ping: Func<(), dyn IPing>,
}

impl IPong for PongFunc {
    fn ping(&self) -> Option<Arc<dyn IPing>> {
        self.ping.call().ok().flatten()
    }
}

impl Reflect for PongFunc {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|ping: Func<(), dyn IPing>| PongFunc { ping })
            .implements::<dyn IPong>(|pong| pong)
            .build()
    }
}

/// Forces its lazy while being constructed.
pub struct PongLazyInConstructor {
    pub ping: Option<Arc<dyn IPing>>,
}

impl IPong for PongLazyInConstructor {
    fn ping(&self) -> Option<Arc<dyn IPing>> {
        self.ping.clone()
    }
}

impl Reflect for PongLazyInConstructor {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .fallible_constructor(|ping: Lazy<dyn IPing>| -> Result<PongLazyInConstructor, CoreError> {
                Ok(PongLazyInConstructor { ping: ping.value()? })
            })
            .implements::<dyn IPong>(|pong| pong)
            .build()
    }
}

/// Forces a lazy without a cycle while being constructed.
pub struct Bar2 {
    pub foo: Option<Arc<dyn IFoo>>,
}

impl Reflect for Bar2 {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .fallible_constructor(|foo: Lazy<dyn IFoo>| -> Result<Bar2, CoreError> { Ok(Bar2 { foo: foo.value()? }) })
            .build()
    }
}

// Weak tracking

pub static WEAK_FOO_BUILT: AtomicUsize = AtomicUsize::new(0);
pub static WEAK_FOO2_BUILT: AtomicUsize = AtomicUsize::new(0);

pub struct WeakFoo;

impl IFoo for WeakFoo {
    fn name(&self) -> &'static str {
        "WeakFoo"
    }
}

impl Reflect for WeakFoo {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| {
                WEAK_FOO_BUILT.fetch_add(1, Ordering::SeqCst);
                WeakFoo
            })
            .implements::<dyn IFoo>(|foo| foo)
            .build()
    }
}

pub struct WeakFoo2;

impl WeakFoo2 {
    pub fn new() -> Self {
        WEAK_FOO2_BUILT.fetch_add(1, Ordering::SeqCst);
        WeakFoo2
    }
}

impl IFoo for WeakFoo2 {
    fn name(&self) -> &'static str {
        "WeakFoo2"
    }
}

impl Reflect for WeakFoo2 {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(WeakFoo2::new)
            .implements::<dyn IFoo>(|foo| foo)
            .build()
    }
}

// Per-instance parameters

pub trait IPerInstanceParameter: Send + Sync {
    fn id(&self) -> String;
}

impl Reflect for dyn IPerInstanceParameter {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().build()
    }
}

pub struct PerInstanceParameter {
    pub id: i32,
    pub foo: Option<Arc<dyn IFoo>>,
}

impl IPerInstanceParameter for PerInstanceParameter {
    fn id(&self) -> String {
        self.id.to_string()
    }
}

impl Reflect for PerInstanceParameter {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|id: i32, foo: Option<Arc<dyn IFoo>>| PerInstanceParameter { id, foo })
            .implements::<dyn IPerInstanceParameter>(|parameter| parameter)
            .build()
    }
}

/// Two overloads told apart by the type of the first override.
pub struct PerInstanceParameter2 {
    pub id: String,
    pub foo: Option<Arc<dyn IFoo>>,
}

impl Reflect for PerInstanceParameter2 {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|id: i32, foo: Option<Arc<dyn IFoo>>| PerInstanceParameter2 {
                id: format!("int:{id}"),
                foo,
            })
            .constructor(|id: Option<String>, foo: Option<Arc<dyn IFoo>>| PerInstanceParameter2 {
                id: format!("string:{}", id.unwrap_or_default()),
                foo,
            })
            .build()
    }
}

pub struct PerInstanceParameterConsumer {
    pub parameter: Arc<dyn IPerInstanceParameter>,
}

impl Reflect for PerInstanceParameterConsumer {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|parameter: Arc<dyn IPerInstanceParameter>| PerInstanceParameterConsumer { parameter })
            .build()
    }
}

pub type ById = Func<(i32,), PerInstanceParameter>;
pub type ByIdAndFoo = Func<(i32, Arc<dyn IFoo>), PerInstanceParameter>;
pub type ByBar = Func<(Arc<dyn IBar>,), PerInstanceParameter>;

pub struct DependsOnPerInstanceParameter {
    pub by_id: Option<Arc<ById>>,
    pub by_id_and_foo: Option<Arc<ByIdAndFoo>>,
}

impl Reflect for DependsOnPerInstanceParameter {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|by_id: Option<Arc<ById>>, by_id_and_foo: Option<Arc<ByIdAndFoo>>| {
                DependsOnPerInstanceParameter { by_id, by_id_and_foo }
            })
            .build()
    }
}

/// Treats `1` and `"1"` as the same override.
pub struct TextualComparer;

impl TextualComparer {
    fn text(arg: &Arg) -> Option<String> {
        arg.downcast_ref::<i32>()
            .map(|value| value.to_string())
            .or_else(|| arg.downcast_ref::<String>().cloned())
    }
}

impl ArgComparer for TextualComparer {
    fn equals(&self, left: &Arg, right: &Arg) -> bool {
        match (Self::text(left), Self::text(right)) {
            (Some(left), Some(right)) => left == right,
            _ => left == right,
        }
    }

    fn hash(&self, arg: &Arg, mut state: &mut dyn Hasher) {
        match Self::text(arg) {
            Some(text) => text.hash(&mut state),
            None => arg.hash(&mut state),
        }
    }
}

// Open generics

pub struct OpenGenericsDefinition;
pub struct OpenGenericsWithIdDefinition;
pub struct IOpenGenericsDefinition;
pub struct IMiddleDefinition;

impl Reflect for OpenGenericsDefinition {
    fn type_info() -> TypeInfo {
        TypeInfo::definition::<Self>().build()
    }
}

impl Reflect for OpenGenericsWithIdDefinition {
    fn type_info() -> TypeInfo {
        TypeInfo::definition::<Self>().build()
    }
}

impl Reflect for IOpenGenericsDefinition {
    fn type_info() -> TypeInfo {
        TypeInfo::definition::<Self>().build()
    }
}

impl Reflect for IMiddleDefinition {
    fn type_info() -> TypeInfo {
        TypeInfo::definition::<Self>().build()
    }
}

pub trait IOpenGenerics<T1, T2>: Send + Sync {
    fn describe(&self) -> String;
}

impl<T1: Reflect, T2: Reflect> Reflect for dyn IOpenGenerics<T1, T2> {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
            .generic::<IOpenGenericsDefinition>(vec![Type::of::<T1>(), Type::of::<T2>()])
            .build()
    }
}

pub trait IMiddle<T1, T2>: Send + Sync {}

impl<T1: Reflect, T2: Reflect> Reflect for dyn IMiddle<T1, T2> {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
            .generic::<IMiddleDefinition>(vec![Type::of::<T1>(), Type::of::<T2>()])
            .build()
    }
}

pub struct OpenGenerics<T1, T2> {
    marker: PhantomData<fn() -> (T1, T2)>,
}

impl<T1: 'static, T2: 'static> IOpenGenerics<T1, T2> for OpenGenerics<T1, T2> {
    fn describe(&self) -> String {
        format!("OpenGenerics<{}, {}>", type_name::<T1>(), type_name::<T2>())
    }
}

impl<T1: 'static, T2: 'static> IMiddle<T1, T2> for OpenGenerics<T1, T2> {}

impl<T1: Reflect, T2: Reflect> Reflect for OpenGenerics<T1, T2> {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|| OpenGenerics { marker: PhantomData })
            .implements::<dyn IOpenGenerics<T1, T2>>(|open| open)
            .implements::<dyn IMiddle<T1, T2>>(|open| open)
            .generic::<OpenGenericsDefinition>(vec![Type::of::<T1>(), Type::of::<T2>()])
            .build()
    }
}

pub struct OpenGenericsWithId<T1, T2> {
    pub id: i32,
    marker: PhantomData<fn() -> (T1, T2)>,
}

impl<T1: 'static, T2: 'static> IOpenGenerics<T1, T2> for OpenGenericsWithId<T1, T2> {
    fn describe(&self) -> String {
        format!("OpenGenericsWithId({})", self.id)
    }
}

impl<T1: Reflect, T2: Reflect> Reflect for OpenGenericsWithId<T1, T2> {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|id: i32| OpenGenericsWithId {
                id,
                marker: PhantomData,
            })
            .implements::<dyn IOpenGenerics<T1, T2>>(|open| open)
            .generic::<OpenGenericsWithIdDefinition>(vec![Type::of::<T1>(), Type::of::<T2>()])
            .build()
    }
}

pub struct DependsOnOpenGenerics<T1, T2> {
    pub data: Option<Arc<dyn IOpenGenerics<T1, T2>>>,
}

impl<T1: Reflect, T2: Reflect> Reflect for DependsOnOpenGenerics<T1, T2> {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|data: Option<Arc<dyn IOpenGenerics<T1, T2>>>| DependsOnOpenGenerics { data })
            .build()
    }
}

pub struct NewestDefinition;

impl Reflect for NewestDefinition {
    fn type_info() -> TypeInfo {
        TypeInfo::definition::<Self>().build()
    }
}

/// Sequence replacement holding only the most recent mapping.
pub struct Newest<T: ?Sized> {
    pub item: Option<Arc<T>>,
}

impl<T: Reflect + ?Sized + Send + Sync> Reflect for Newest<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|item: Option<Arc<T>>| Newest { item })
            .implements::<Many<T>>(|newest| Arc::new(Many::from(newest.item.iter().cloned().collect::<Vec<_>>())))
            .generic::<NewestDefinition>(vec![Type::of::<T>()])
            .build()
    }
}

pub struct Scaled {
    pub factor: f64,
}

impl Reflect for Scaled {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().constructor(|factor: f64| Scaled { factor }).build()
    }
}

pub struct MisdeclaredDefault;

impl IFoo for MisdeclaredDefault {
    fn name(&self) -> &'static str {
        "MisdeclaredDefault"
    }
}

impl Reflect for MisdeclaredDefault {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .constructor(|_count: i32| MisdeclaredDefault)
            .default_arg(1, 5i32)
            .implements::<dyn IFoo>(|misdeclared| misdeclared)
            .build()
    }
}
