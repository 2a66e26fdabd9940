//! End-to-end command plumbing: registry extraction, connectivity map
//! serialization, cacheable-set selection.

use mc_analyze::callgraph::CallGraph;
use mc_analyze::select_cacheable;
use mc_cli::commands::{build_registry, graph_to_json};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn registry_covers_every_fixture_file() {
    let registry = build_registry(&fixtures()).unwrap();
    assert_eq!(registry.len(), 3);
    let helper = registry.get("helper").unwrap();
    assert_eq!(helper.inputs, vec!["x"]);
    assert_eq!(helper.outputs, vec!["y"]);
}

#[test]
fn connectivity_map_matches_persisted_format() {
    let registry = build_registry(&fixtures()).unwrap();
    let (graph, root) = CallGraph::build(&fixtures().join("caller.m"), &registry).unwrap();
    let value = graph_to_json(&graph, root);

    assert_eq!(
        value["caller"],
        json!({
            "child_nodes": ["helper", "finish"],
            "parent_nodes": [],
            "input": ["x"],
            "output": ["out"],
            "cnt_vars_parents": {},
            "cnt_vars_children": {
                "x": [["helper", "x"]],
                "mid": [["finish", "x"]],
            },
        })
    );
    assert_eq!(
        value["helper"],
        json!({
            "child_nodes": [],
            "parent_nodes": ["caller"],
            "input": ["x"],
            "output": ["y"],
            "cnt_vars_parents": { "y": [["caller", "mid"]] },
            "cnt_vars_children": {},
        })
    );
}

#[test]
fn cacheable_set_over_the_fixture_chain() {
    let registry = build_registry(&fixtures()).unwrap();
    let selected =
        select_cacheable(&fixtures().join("caller.m"), &registry, &BTreeSet::new()).unwrap();
    let expected: BTreeSet<String> = ["helper", "finish"].iter().map(|s| s.to_string()).collect();
    assert_eq!(selected, expected);
}
