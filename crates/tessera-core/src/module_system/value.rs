use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A module's resolved value, shared with its dependents.
///
/// Values are type-erased; readers downcast to the concrete type they expect.
/// Cloning only bumps a reference count, so every dependent observes the same
/// underlying value.
#[derive(Clone)]
pub struct ModuleValue(Arc<dyn Any + Send + Sync>);

impl ModuleValue {
    /// Wrap an owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Share an already reference-counted value without wrapping it twice.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrow the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Get a shared handle on the value as `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Whether both handles point at the same value.
    pub fn ptr_eq(&self, other: &ModuleValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(json) = self.downcast_ref::<serde_json::Value>() {
            return write!(f, "ModuleValue({})", json);
        }
        f.write_str("ModuleValue(..)")
    }
}

/// Resolved values of a module's dependencies, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    entries: Vec<(String, Option<ModuleValue>)>,
}

impl Dependencies {
    pub fn new(entries: Vec<(String, Option<ModuleValue>)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the dependency at `index`, in declaration order.
    pub fn value(&self, index: usize) -> Option<&ModuleValue> {
        self.entries.get(index).and_then(|(_, value)| value.as_ref())
    }

    /// Value of the dependency called `name`.
    pub fn by_name(&self, name: &str) -> Option<&ModuleValue> {
        self.entries
            .iter()
            .find(|(dependency, _)| dependency == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Shared handle on the dependency called `name`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.by_name(name).and_then(ModuleValue::downcast::<T>)
    }

    /// Borrow the dependency called `name` as `T`.
    pub fn get_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.by_name(name).and_then(ModuleValue::downcast_ref::<T>)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ModuleValue>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}
