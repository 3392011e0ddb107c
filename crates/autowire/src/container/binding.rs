use indexmap::IndexMap;

use crate::container::descriptor::Type;
use crate::container::instance::{Instance, WeakInstance};
use crate::container::key::{Arg, TypeKey};

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Strong(Option<Instance>),
    Weak(WeakInstance),
}

/// One registration in the mapping store.
///
/// Explicit bindings come from user mappings and hold their value strongly.
/// Implicit bindings are written by the resolver as a cache and only keep a
/// weak reference, so the value is rebuilt once every owner dropped it.
#[derive(Debug, Clone)]
pub struct Binding {
    source: Type,
    target: Option<Type>,
    slot: Slot,
    explicit: bool,
    default_overrides: Vec<Arg>,
}

impl Binding {
    pub(crate) fn to_type(source: Type, target: Type, default_overrides: Vec<Arg>) -> Self {
        Self {
            source,
            target: Some(target),
            slot: Slot::Empty,
            explicit: true,
            default_overrides,
        }
    }

    pub(crate) fn to_instance(source: Type, instance: Option<Instance>) -> Self {
        Self {
            source,
            target: instance.as_ref().map(|instance| instance.instance_type().clone()),
            slot: Slot::Strong(instance),
            explicit: true,
            default_overrides: Vec::new(),
        }
    }

    /// Explicit binding to an object the container must not keep alive.
    pub(crate) fn to_owner(source: Type, target: Type, owner: WeakInstance) -> Self {
        Self {
            source,
            target: Some(target),
            slot: Slot::Weak(owner),
            explicit: true,
            default_overrides: Vec::new(),
        }
    }

    /// Cache entry; it has no target until a value is stored.
    pub(crate) fn implicit(source: Type, default_overrides: Vec<Arg>) -> Self {
        Self {
            target: None,
            source,
            slot: Slot::Empty,
            explicit: false,
            default_overrides,
        }
    }

    pub fn source(&self) -> &Type {
        &self.source
    }

    pub fn target(&self) -> Option<&Type> {
        self.target.as_ref()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn default_overrides(&self) -> &[Arg] {
        &self.default_overrides
    }

    /// The stored value: `None` when nothing is stored or a weak value was
    /// reclaimed, `Some(None)` for a stored absence.
    pub fn value(&self) -> Option<Option<Instance>> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Strong(value) => Some(value.clone()),
            Slot::Weak(weak) => weak.upgrade().map(Some),
        }
    }

    pub fn has_value(&self) -> bool {
        match &self.slot {
            Slot::Empty => false,
            Slot::Strong(_) => true,
            Slot::Weak(weak) => weak.is_alive(),
        }
    }

    pub(crate) fn set_value(&mut self, value: Option<Instance>) {
        match &value {
            Some(instance) => self.target = Some(instance.instance_type().clone()),
            None if !self.explicit => self.target = None,
            None => {}
        }
        self.slot = match value {
            Some(instance) if !self.explicit => Slot::Weak(instance.downgrade()),
            value => Slot::Strong(value),
        };
    }
}

/// Append-only store of bindings, keyed by [`TypeKey`].
///
/// The last binding registered under a key wins single resolution; the
/// registration order of explicit bindings is kept for collections.
#[derive(Debug, Default)]
pub struct MappingStore {
    entries: IndexMap<TypeKey, Vec<Binding>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: TypeKey, binding: Binding) {
        self.entries.entry(key).or_default().push(binding);
    }

    pub fn lookup(&self, key: &TypeKey) -> &[Binding] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last(&self, key: &TypeKey) -> Option<&Binding> {
        self.lookup(key).last()
    }

    pub fn last_mut(&mut self, key: &TypeKey) -> Option<&mut Binding> {
        self.entries.get_mut(key).and_then(|bindings| bindings.last_mut())
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        !self.lookup(key).is_empty()
    }

    pub fn has_explicit(&self, key: &TypeKey) -> bool {
        self.lookup(key).iter().any(Binding::is_explicit)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
