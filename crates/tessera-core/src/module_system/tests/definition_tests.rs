use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::module_system::definition::{
    Component, DependencyList, ModuleDefinition, StartResult, StopResult,
};
use crate::module_system::value::{Dependencies, ModuleValue};

#[test]
fn test_dependency_list_conversions() {
    assert!(DependencyList::from("").is_empty());
    assert_eq!(DependencyList::from("db").as_slice(), &["db".to_string()]);
    assert_eq!(DependencyList::from(String::from("db")).as_slice(), &["db".to_string()]);
    assert_eq!(DependencyList::from(["a", "b"]).into_vec(), vec!["a", "b"]);
    assert_eq!(DependencyList::from(vec!["a".to_string()]).into_vec(), vec!["a"]);
    assert_eq!(DependencyList::from(&["x", "y"][..]).into_vec(), vec!["x", "y"]);
    assert!(DependencyList::from(None::<&str>).is_empty());
    assert_eq!(DependencyList::from(Some("db")).into_vec(), vec!["db"]);
}

#[test]
fn test_builder_records_shape() {
    let definition = ModuleDefinition::new("web").depends_on(["db", "cache"]);
    assert_eq!(definition.name(), Some("web"));
    assert_eq!(definition.dependencies(), &["db".to_string(), "cache".to_string()]);

    let anonymous = ModuleDefinition::anonymous();
    assert_eq!(anonymous.name(), None);
    assert!(anonymous.dependencies().is_empty());

    let renamed = ModuleDefinition::anonymous().named("late");
    assert_eq!(renamed.name(), Some("late"));
}

#[test]
fn test_module_value_downcasts() {
    let value = ModuleValue::new(42u32);
    assert!(value.is::<u32>());
    assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    assert!(value.downcast_ref::<String>().is_none());
    assert_eq!(value.downcast::<u32>().as_deref(), Some(&42));

    let copy = value.clone();
    assert!(copy.ptr_eq(&value), "Clones share the same value");
    assert!(!ModuleValue::new(42u32).ptr_eq(&value));
}

#[test]
fn test_module_value_debug_shows_json() {
    let json = ModuleValue::new(serde_json::json!({ "port": 8080 }));
    assert_eq!(format!("{:?}", json), r#"ModuleValue({"port":8080})"#);
    assert_eq!(format!("{:?}", ModuleValue::new(1u8)), "ModuleValue(..)");
}

#[test]
fn test_dependencies_by_position_and_name() {
    let deps = Dependencies::new(vec![
        ("a".to_string(), Some(ModuleValue::new(1u32))),
        ("b".to_string(), None),
        ("c".to_string(), Some(ModuleValue::new("three".to_string()))),
    ]);

    assert_eq!(deps.len(), 3);
    assert_eq!(deps.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(deps.value(0).and_then(|v| v.downcast_ref::<u32>()), Some(&1));
    assert!(deps.value(1).is_none());
    assert!(deps.value(7).is_none());
    assert_eq!(deps.get_ref::<String>("c").map(String::as_str), Some("three"));
    assert_eq!(deps.get::<u32>("a").as_deref(), Some(&1));
    assert!(deps.get::<u32>("c").is_none(), "Wrong type yields None");
    assert!(deps.by_name("missing").is_none());
}

struct Counter {
    stopped: AtomicBool,
}

#[async_trait]
impl Component for Counter {}

struct Greeter {
    greeting: String,
}

#[async_trait]
impl Component for Greeter {
    fn dependencies(&self) -> Vec<String> {
        vec!["name".to_string()]
    }

    async fn start(self: Arc<Self>, dependencies: Dependencies) -> StartResult {
        let name = dependencies.get_ref::<String>("name").cloned().unwrap_or_default();
        Ok(Some(ModuleValue::new(format!("{} {}", self.greeting, name))))
    }

    async fn stop(self: Arc<Self>, this: Option<ModuleValue>, _dependencies: Dependencies) -> StopResult {
        match this.as_ref().and_then(|value| value.downcast_ref::<String>()) {
            Some(_) => Ok(()),
            None => Err("stop received no value".into()),
        }
    }
}

#[tokio::test]
async fn test_component_defaults_return_instance() {
    let counter = Arc::new(Counter { stopped: AtomicBool::new(false) });
    let definition = ModuleDefinition::component("counter", Arc::clone(&counter));
    assert!(definition.dependencies().is_empty());

    let start = definition.start.clone().expect("component has a start behavior");
    let value = start(Dependencies::default())
        .await
        .expect("default start succeeds")
        .expect("default start returns the instance");
    let instance = value.downcast::<Counter>().expect("value is the component");
    assert!(Arc::ptr_eq(&instance, &counter));
    assert!(!instance.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_component_overrides() {
    let greeter = Arc::new(Greeter { greeting: "hello".to_string() });
    let definition = ModuleDefinition::anonymous_component(greeter);
    assert_eq!(definition.name(), None);
    assert_eq!(definition.dependencies(), &["name".to_string()]);

    let deps = Dependencies::new(vec![("name".to_string(), Some(ModuleValue::new("world".to_string())))]);
    let start = definition.start.clone().expect("component has a start behavior");
    let value = start(deps.clone()).await.expect("start succeeds");
    assert_eq!(
        value.as_ref().and_then(|v| v.downcast_ref::<String>()).map(String::as_str),
        Some("hello world")
    );

    let stop = definition.stop.clone().expect("component has a stop behavior");
    stop(value, deps.clone()).await.expect("stop succeeds with its value");
    assert!(stop(None, deps).await.is_err());
}

#[test]
fn test_depends_on_overrides_component_dependencies() {
    let greeter = Arc::new(Greeter { greeting: "hi".to_string() });
    let definition = ModuleDefinition::component("greeter", greeter).depends_on(["user"]);
    assert_eq!(definition.dependencies(), &["user".to_string()]);
}
