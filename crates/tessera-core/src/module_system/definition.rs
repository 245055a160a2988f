use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::module_system::value::{Dependencies, ModuleValue};

/// Error type returned by module behaviors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What a start behavior produces: a value, or nothing for anonymous modules.
pub type StartResult = std::result::Result<Option<ModuleValue>, BoxError>;

/// What a stop behavior produces.
pub type StopResult = std::result::Result<(), BoxError>;

/// Type-erased start behavior: dependency values in, resolved value out.
pub type StartBehavior = Arc<dyn Fn(Dependencies) -> BoxFuture<'static, StartResult> + Send + Sync>;

/// Type-erased stop behavior: the module's own value, then its dependencies.
pub type StopBehavior =
    Arc<dyn Fn(Option<ModuleValue>, Dependencies) -> BoxFuture<'static, StopResult> + Send + Sync>;

/// Lifecycle of an object registered as a module ("instance mode").
///
/// Every method has a default: no dependencies, a start that hands the
/// instance itself to dependents, and a stop that does nothing.
#[async_trait]
pub trait Component: Send + Sync + Sized + 'static {
    /// Names of the modules this component needs, in the order `start` receives them.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    async fn start(self: Arc<Self>, _dependencies: Dependencies) -> StartResult {
        Ok(Some(ModuleValue::from_arc(self)))
    }

    async fn stop(self: Arc<Self>, _this: Option<ModuleValue>, _dependencies: Dependencies) -> StopResult {
        Ok(())
    }
}

/// Ordered dependency names of a module definition.
///
/// Converts from the shapes a caller naturally has at hand: a single name
/// (the empty string meaning "none"), or any sequence of names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyList(Vec<String>);

impl DependencyList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for DependencyList {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            Self::new()
        } else {
            Self(vec![name.to_string()])
        }
    }
}

impl From<String> for DependencyList {
    fn from(name: String) -> Self {
        DependencyList::from(name.as_str())
    }
}

impl From<&String> for DependencyList {
    fn from(name: &String) -> Self {
        DependencyList::from(name.as_str())
    }
}

impl From<Vec<String>> for DependencyList {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for DependencyList {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for DependencyList {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

impl From<&[String]> for DependencyList {
    fn from(names: &[String]) -> Self {
        Self(names.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for DependencyList {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

impl<T: Into<DependencyList>> From<Option<T>> for DependencyList {
    fn from(names: Option<T>) -> Self {
        names.map(Into::into).unwrap_or_default()
    }
}

/// Canonical registration input: every registration shape is built from one.
///
/// ```
/// use tessera_core::module_system::{ModuleDefinition, ModuleValue};
///
/// let definition = ModuleDefinition::new("greeting")
///     .depends_on(["name"])
///     .on_start(|deps| async move {
///         let name = deps.get::<String>("name").map(|n| n.to_string()).unwrap_or_default();
///         Ok(Some(ModuleValue::new(format!("hello {}", name))))
///     });
/// assert_eq!(definition.name(), Some("greeting"));
/// ```
#[derive(Default)]
pub struct ModuleDefinition {
    pub(crate) name: Option<String>,
    pub(crate) dependencies: Option<DependencyList>,
    pub(crate) start: Option<StartBehavior>,
    pub(crate) stop: Option<StopBehavior>,
    pub(crate) backing: Option<ModuleValue>,
}

impl ModuleDefinition {
    /// A named module with no dependencies and default behaviors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A module whose name the registry generates.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Bind an object's lifecycle under `name`.
    pub fn component<C: Component>(name: impl Into<String>, instance: Arc<C>) -> Self {
        Self::anonymous_component(instance).named(name)
    }

    /// Bind an object's lifecycle under a generated name.
    pub fn anonymous_component<C: Component>(instance: Arc<C>) -> Self {
        let dependencies = DependencyList::from(instance.dependencies());
        let start_instance = Arc::clone(&instance);
        let stop_instance = Arc::clone(&instance);
        let start: StartBehavior =
            Arc::new(move |deps| -> BoxFuture<'static, StartResult> { C::start(Arc::clone(&start_instance), deps) });
        let stop: StopBehavior = Arc::new(
            move |this, deps| -> BoxFuture<'static, StopResult> { C::stop(Arc::clone(&stop_instance), this, deps) },
        );

        Self {
            name: None,
            dependencies: Some(dependencies),
            start: Some(start),
            stop: Some(stop),
            backing: Some(ModuleValue::from_arc(instance)),
        }
    }

    /// Replace the module name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare the modules this one needs, replacing any earlier declaration.
    pub fn depends_on(mut self, dependencies: impl Into<DependencyList>) -> Self {
        self.dependencies = Some(dependencies.into());
        self
    }

    pub fn on_start<F, Fut>(mut self, start: F) -> Self
    where
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StartResult> + Send + 'static,
    {
        self.start = Some(Arc::new(move |deps| start(deps).boxed()));
        self
    }

    pub fn on_stop<F, Fut>(mut self, stop: F) -> Self
    where
        F: Fn(Option<ModuleValue>, Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StopResult> + Send + 'static,
    {
        self.stop = Some(Arc::new(move |this, deps| stop(this, deps).boxed()));
        self
    }

    /// The object the default start behavior hands to dependents.
    pub fn with_backing(mut self, backing: ModuleValue) -> Self {
        self.backing = Some(backing);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        self.dependencies
            .as_ref()
            .map(DependencyList::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("has_start", &self.start.is_some())
            .field("has_stop", &self.stop.is_some())
            .finish()
    }
}

/// Backing object of a module defined without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub dependencies: Vec<String>,
}
