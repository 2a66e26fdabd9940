//! Call-graph construction over the `.m` fixture set.

use mc_analyze::callgraph::{CallGraph, ParentRef};
use mc_core::error::Error;
use mc_core::registry::{FunctionSignature, SignatureRegistry};
use mc_parser::signature::extract_signature;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Registry built the way the `tag` pass does it: one signature per fixture
/// file that declares a function.
fn fixture_registry() -> SignatureRegistry {
    let mut registry = SignatureRegistry::new();
    for entry in fs::read_dir(fixture("")).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().map(|e| e == "m").unwrap_or(false) {
            let source = fs::read_to_string(&path).unwrap();
            if let Some(header) = extract_signature(&source) {
                registry.insert(
                    header.name,
                    FunctionSignature::new(header.inputs, header.outputs),
                );
            }
        }
    }
    registry
}

#[test]
fn diamond_reuses_one_node_per_function() {
    let registry = fixture_registry();
    let (graph, root) = CallGraph::build(&fixture("main.m"), &registry).unwrap();

    // combine has no fixture file and no registry entry, so it is absent
    assert_eq!(graph.len(), 4);
    assert!(graph.lookup("combine").is_none());

    let main = graph.node(root);
    let child_names: Vec<&str> = main
        .children
        .iter()
        .map(|&id| graph.node(id).name.as_str())
        .collect();
    assert_eq!(child_names, vec!["left", "right"]);

    let shared = graph.node(graph.lookup("shared").unwrap());
    let parent_names: Vec<&str> = shared
        .parents
        .iter()
        .map(|&id| graph.node(id).name.as_str())
        .collect();
    assert_eq!(parent_names, vec!["left", "right"]);
    assert_eq!(
        shared.cnt_vars_parents["y"],
        vec![
            ParentRef {
                func: "left".into(),
                var: "y".into(),
                derived: false,
            },
            ParentRef {
                func: "right".into(),
                var: "y".into(),
                derived: false,
            },
        ]
    );
}

#[test]
fn nested_call_binds_arguments_and_derived_output() {
    let registry = fixture_registry();
    let (graph, root) = CallGraph::build(&fixture("nested_example.m"), &registry).unwrap();

    let caller = graph.node(root);
    assert_eq!(caller.cnt_vars_children["x"], vec![("g".into(), "a".into())]);
    assert_eq!(caller.cnt_vars_children["2"], vec![("g".into(), "b".into())]);
    assert_eq!(
        caller.cnt_vars_children["g(x,2)"],
        vec![("f".into(), "t".into())]
    );

    // g's output only reaches a name through the statement target, so the
    // pairing is the derived one
    let g = graph.node(graph.lookup("g").unwrap());
    assert_eq!(
        g.cnt_vars_parents["t"],
        vec![ParentRef {
            func: "nested_example".into(),
            var: "y".into(),
            derived: true,
        }]
    );
    assert_eq!(g.cnt_vars_parents["t"][0].render(), "y(@)");

    let f = graph.node(graph.lookup("f").unwrap());
    assert_eq!(
        f.cnt_vars_parents["y"],
        vec![ParentRef {
            func: "nested_example".into(),
            var: "y".into(),
            derived: false,
        }]
    );
}

#[test]
fn pipeline_pairs_caller_locals_with_callee_inputs() {
    let registry = fixture_registry();
    let (graph, root) = CallGraph::build(&fixture("pipeline.m"), &registry).unwrap();

    let pipeline = graph.node(root);
    assert_eq!(
        pipeline.cnt_vars_children["sig"],
        vec![("prep".into(), "x".into()), ("jitter".into(), "x".into())]
    );

    let my_slope = graph.node(graph.lookup("my_slope").unwrap());
    assert_eq!(
        my_slope.cnt_vars_parents["slope"],
        vec![ParentRef {
            func: "pipeline".into(),
            var: "Slope".into(),
            derived: true,
        }]
    );

    let prep = graph.node(graph.lookup("prep").unwrap());
    assert_eq!(
        prep.cnt_vars_parents["y"],
        vec![ParentRef {
            func: "pipeline".into(),
            var: "clean".into(),
            derived: false,
        }]
    );
}

#[test]
fn missing_callee_file_stays_a_leaf() {
    let mut registry = fixture_registry();
    registry.insert(
        "ghost",
        FunctionSignature::new(vec!["x".into()], vec!["y".into()]),
    );
    let (graph, _) = CallGraph::build(&fixture("calls_ghost.m"), &registry).unwrap();
    let ghost = graph.node(graph.lookup("ghost").unwrap());
    assert!(ghost.children.is_empty());
    assert_eq!(
        ghost.cnt_vars_parents["y"],
        vec![ParentRef {
            func: "calls_ghost".into(),
            var: "out".into(),
            derived: false,
        }]
    );
}

#[test]
fn argument_surplus_is_an_arity_error() {
    let registry = fixture_registry();
    let err = CallGraph::build(&fixture("arity_bad.m"), &registry).unwrap_err();
    assert!(matches!(err, Error::ArityMismatch { line: 2, .. }));
}

#[test]
fn missing_root_file_is_fatal() {
    let registry = fixture_registry();
    let err = CallGraph::build(&fixture("no_such.m"), &registry).unwrap_err();
    assert!(err.is_file_not_found());
}
