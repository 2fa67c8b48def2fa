// tests/graph_builder.rs

mod common;
use crate::common::builders::{SessionFileBuilder, StaticResolver, TargetConfigBuilder, ids};

use stampede::dag::{DagGraph, TargetQueue};
use stampede::errors::StampedeError;

#[test]
fn visits_targets_breadth_first_from_roots() {
    let resolver = StaticResolver::new()
        .target("app", &["lib", "util"])
        .target("lib", &["core"])
        .target("util", &["core"])
        .target("core", &[])
        .target("unrelated", &[]);

    let graph = resolver.graph(&["app"]);
    let order: Vec<&str> = graph.targets().collect();
    assert_eq!(order, vec!["app", "lib", "util", "core"]);
    assert!(!graph.targets().any(|t| t == "unrelated"));
    assert_eq!(graph.roots(), ids(&["app"]).as_slice());
}

#[test]
fn records_edges_in_both_directions() {
    let graph = StaticResolver::new()
        .target("app", &["lib", "util"])
        .target("lib", &["core"])
        .target("util", &["core"])
        .target("core", &[])
        .graph(&["app"]);

    assert_eq!(graph.dependencies_of("app"), ids(&["lib", "util"]).as_slice());
    assert_eq!(graph.dependents_of("core"), ids(&["lib", "util"]).as_slice());
    assert!(graph.dependents_of("app").is_empty());
    assert!(graph.dependencies_of("missing").is_empty());
}

#[test]
fn runtime_deps_are_edges_too() {
    let graph = StaticResolver::new()
        .target_with_runtime("bin", &["lib"], &["helper"])
        .target("lib", &[])
        .target("helper", &[])
        .graph(&["bin"]);

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.dependencies_of("bin"), ids(&["lib", "helper"]).as_slice());

    let queue = TargetQueue::new(&graph);
    assert_eq!(queue.state_of("bin").unwrap().unsatisfied, 2);
}

#[test]
fn overlapping_static_and_runtime_deps_count_once() {
    let graph = StaticResolver::new()
        .target_with_runtime("bin", &["lib", "lib"], &["lib"])
        .target("lib", &[])
        .graph(&["bin"]);

    assert_eq!(graph.dependencies_of("bin"), ids(&["lib"]).as_slice());
    assert_eq!(graph.dependents_of("lib"), ids(&["bin"]).as_slice());

    let mut queue = TargetQueue::new(&graph);
    assert_eq!(queue.state_of("bin").unwrap().unsatisfied, 1);
    // lib -> bin fuses, which needs bin to wait on lib alone.
    let units = queue.dequeue_work(&[], 1).unwrap();
    assert_eq!(units[0].target_ids, ids(&["lib", "bin"]));
}

#[test]
fn shared_roots_are_visited_once() {
    let graph = StaticResolver::new()
        .target("a", &["b"])
        .target("b", &[])
        .graph(&["a", "b", "a"]);

    assert_eq!(graph.len(), 2);
}

#[test]
fn unresolved_root_fails_construction() {
    let resolver = StaticResolver::new().target("a", &[]);

    let err = DagGraph::build(&ids(&["ghost"]), &resolver).unwrap_err();
    match err {
        StampedeError::Construction(msg) => assert!(msg.contains("ghost"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unresolved_dependency_fails_construction() {
    let resolver = StaticResolver::new()
        .target("a", &["b"])
        .target("b", &["missing"]);

    let err = TargetQueue::from_resolver(&ids(&["a"]), &resolver).unwrap_err();
    assert!(matches!(err, StampedeError::Construction(_)), "{err:?}");
}

#[test]
fn topological_order_puts_dependencies_first() {
    let graph = StaticResolver::new()
        .target("app", &["lib", "util"])
        .target("lib", &["core"])
        .target("util", &["core", "lib"])
        .target("core", &[])
        .graph(&["app"]);

    let order = graph.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|t| t == name).unwrap();

    assert_eq!(order.len(), 4);
    assert!(pos("core") < pos("lib"));
    assert!(pos("lib") < pos("util"));
    assert!(pos("util") < pos("app"));
}

#[test]
fn topological_order_rejects_cycles() {
    let graph = StaticResolver::new()
        .target("a", &["b"])
        .target("b", &["a"])
        .graph(&["a"]);

    let err = graph.topological_order().unwrap_err();
    assert!(matches!(err, StampedeError::Construction(_)), "{err:?}");
}

#[test]
fn session_file_resolves_targets() {
    let cfg = SessionFileBuilder::new()
        .with_root("//app:main")
        .with_target(
            "//app:main",
            TargetConfigBuilder::new()
                .cmd("echo main")
                .dep("//lib:a")
                .runtime_dep("//tools:helper")
                .build(),
        )
        .with_target("//lib:a", TargetConfigBuilder::new().cmd("echo a").build())
        .with_target("//tools:helper", TargetConfigBuilder::new().build())
        .with_target("//other:unused", TargetConfigBuilder::new().build())
        .build();

    let graph = DagGraph::from_config(&cfg).unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(
        graph.dependencies_of("//app:main"),
        ids(&["//lib:a", "//tools:helper"]).as_slice()
    );
}

#[test]
fn session_file_with_unknown_dep_fails_at_graph_time() {
    let cfg = SessionFileBuilder::new()
        .with_root("a")
        .with_target("a", TargetConfigBuilder::new().dep("nope").build())
        .build();

    let err = DagGraph::from_config(&cfg).unwrap_err();
    assert!(matches!(err, StampedeError::Construction(_)), "{err:?}");
}
