use std::sync::Arc;

use crate::module_system::definition::ModuleDefinition;
use crate::module_system::error::ModuleSystemError;
use crate::module_system::record::ModuleRecord;
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::resolver::{OrderResolver, RankedModule};

fn records(definitions: Vec<ModuleDefinition>) -> Vec<Arc<ModuleRecord>> {
    let mut registry = ModuleRegistry::new();
    for definition in definitions {
        registry.register(definition).expect("definition should register");
    }
    registry.modules().to_vec()
}

#[test]
fn test_empty_graph() {
    let ranking = OrderResolver::compute(&[]).expect("empty graph is valid");
    assert!(ranking.is_empty());
}

#[test]
fn test_rank_is_one_more_than_highest_dependency() {
    let modules = records(vec![
        ModuleDefinition::new("app").depends_on(["db", "cache"]),
        ModuleDefinition::new("cache").depends_on("config"),
        ModuleDefinition::new("db").depends_on(["config", "cache"]),
        ModuleDefinition::new("config"),
        ModuleDefinition::new("logger"),
    ]);

    let ranking = OrderResolver::compute(&modules).expect("graph is valid");
    let rank_of = |name: &str| {
        let position = modules.iter().position(|r| r.name() == name).expect("module exists");
        ranking.rank(position).expect("rank computed")
    };
    assert_eq!(rank_of("config"), 0);
    assert_eq!(rank_of("logger"), 0);
    assert_eq!(rank_of("cache"), 1);
    assert_eq!(rank_of("db"), 2);
    assert_eq!(rank_of("app"), 3);
}

#[test]
fn test_compute_does_not_assign() {
    let modules = records(vec![ModuleDefinition::new("a")]);
    OrderResolver::compute(&modules).expect("graph is valid");
    assert_eq!(modules[0].rank(), None);

    OrderResolver::assign(&modules).expect("graph is valid");
    assert_eq!(modules[0].rank(), Some(0));
}

#[test]
fn test_assign_twice_is_rejected() {
    let modules = records(vec![ModuleDefinition::new("a")]);
    OrderResolver::assign(&modules).expect("first assignment");
    assert!(matches!(
        OrderResolver::assign(&modules),
        Err(ModuleSystemError::RankAlreadyAssigned { rank: 0, .. })
    ));
}

#[test]
fn test_ascending_and_descending_keep_ties_in_order() {
    let modules = records(vec![
        ModuleDefinition::new("b").depends_on("a"),
        ModuleDefinition::new("a"),
        ModuleDefinition::new("c").depends_on("a"),
        ModuleDefinition::new("z"),
    ]);
    let ranking = OrderResolver::compute(&modules).expect("graph is valid");
    assert_eq!(ranking.ascending(), vec![1, 3, 0, 2]);
    assert_eq!(ranking.descending(), vec![0, 2, 1, 3]);
}

#[test]
fn test_missing_dependencies_listed_once_in_reference_order() {
    let modules = records(vec![
        ModuleDefinition::new("a").depends_on(["x", "root"]),
        ModuleDefinition::new("b").depends_on(["y", "x"]),
        ModuleDefinition::new("root"),
    ]);
    match OrderResolver::compute(&modules) {
        Err(ModuleSystemError::MissingDependency { names }) => assert_eq!(names, vec!["x", "y"]),
        other => panic!("Expected MissingDependency, got {:?}", other),
    }
}

#[test]
fn test_no_root_module() {
    let modules = records(vec![
        ModuleDefinition::new("a").depends_on("b"),
        ModuleDefinition::new("b").depends_on("a"),
    ]);
    assert!(matches!(OrderResolver::compute(&modules), Err(ModuleSystemError::NoRootModule)));
}

#[test]
fn test_cycle_names_stuck_modules() {
    let modules = records(vec![
        ModuleDefinition::new("root"),
        ModuleDefinition::new("a").depends_on(["root", "c"]),
        ModuleDefinition::new("b").depends_on("a"),
        ModuleDefinition::new("c").depends_on("b"),
        ModuleDefinition::new("d").depends_on("c"),
        ModuleDefinition::new("ok").depends_on("root"),
    ]);
    match OrderResolver::compute(&modules) {
        Err(ModuleSystemError::CircularDependency { modules }) => {
            assert_eq!(modules, vec!["a", "b", "c", "d"]);
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
    assert!(modules.iter().all(|record| record.rank().is_none()));
}

#[test]
fn test_graph_faults_are_flagged() {
    assert!(ModuleSystemError::NoRootModule.is_graph_fault());
    assert!(ModuleSystemError::CircularDependency { modules: vec![] }.is_graph_fault());
    assert!(ModuleSystemError::MissingDependency { names: vec![] }.is_graph_fault());
    assert!(!ModuleSystemError::MissingStartValue { module: "a".to_string() }.is_graph_fault());
}

#[test]
fn test_plan_lists_names_by_rank() {
    let modules = records(vec![
        ModuleDefinition::new("web").depends_on("db"),
        ModuleDefinition::new("db"),
    ]);
    let plan = OrderResolver::plan(&modules).expect("graph is valid");
    assert_eq!(
        plan,
        vec![
            RankedModule { name: "db".to_string(), rank: 0 },
            RankedModule { name: "web".to_string(), rank: 1 },
        ]
    );
}
