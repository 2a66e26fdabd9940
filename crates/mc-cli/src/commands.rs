//! `tag`, `graph` and `cache` subcommand implementations.

use clap::Args;
use mc_analyze::callgraph::{CallGraph, NodeId};
use mc_analyze::select_cacheable;
use mc_core::registry::{FunctionSignature, SignatureRegistry};
use mc_core::{Error, Result};
use mc_parser::signature::extract_signature;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Directory containing the `.m` sources to scan
    pub code_dir: PathBuf,

    /// Destination of the signature registry JSON (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Root `.m` file of the call graph
    pub root: PathBuf,

    /// Signature registry JSON produced by `mc tag`
    #[arg(short, long)]
    pub registry: PathBuf,

    /// Destination of the connectivity map JSON (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Root `.m` file to select cacheable results for
    pub root: PathBuf,

    /// Signature registry JSON produced by `mc tag`
    #[arg(short, long)]
    pub registry: PathBuf,

    /// Function names that never qualify, repeatable
    #[arg(short = 'x', long = "exclude")]
    pub exclusions: Vec<String>,

    /// Destination of the cacheable-set JSON (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Extract one signature per `.m` file in a directory.
pub fn build_registry(code_dir: &Path) -> Result<SignatureRegistry> {
    let mut registry = SignatureRegistry::new();
    let entries = fs::read_dir(code_dir).map_err(|e| Error::from_io(e, code_dir))?;
    for entry in entries {
        let path = entry
            .map_err(|e| Error::from_io(e, code_dir))?
            .path();
        if !path.extension().map(|ext| ext == "m").unwrap_or(false) {
            continue;
        }
        let source = fs::read_to_string(&path).map_err(|e| Error::from_io(e, &path))?;
        match extract_signature(&source) {
            Some(header) => {
                debug!(file = %path.display(), function = %header.name, "tagged");
                registry.insert(
                    header.name,
                    FunctionSignature::new(header.inputs, header.outputs),
                );
            }
            None => warn!(file = %path.display(), "no function declaration found"),
        }
    }
    Ok(registry)
}

pub fn load_registry(path: &Path) -> Result<SignatureRegistry> {
    let text = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
    Ok(serde_json::from_str(&text)?)
}

/// Connectivity map of the graph reachable from `root`, in the persisted
/// format: one object per function, keyed by name, listing child/parent
/// names, declared inputs/outputs, and the positional variable pairings
/// (derived pairings rendered with the `(@)` suffix).
pub fn graph_to_json(graph: &CallGraph, root: NodeId) -> Value {
    let mut map = serde_json::Map::new();
    let mut visited = HashSet::new();
    collect_node(graph, root, &mut map, &mut visited);
    Value::Object(map)
}

fn collect_node(
    graph: &CallGraph,
    id: NodeId,
    map: &mut serde_json::Map<String, Value>,
    visited: &mut HashSet<NodeId>,
) {
    if !visited.insert(id) {
        return;
    }
    let node = graph.node(id);
    let name_of = |id: &NodeId| graph.node(*id).name.clone();
    let parents: Value = node
        .cnt_vars_parents
        .iter()
        .map(|(var, refs)| {
            let pairs: Vec<Value> = refs
                .iter()
                .map(|r| json!([r.func, r.render()]))
                .collect();
            (var.clone(), Value::Array(pairs))
        })
        .collect::<serde_json::Map<_, _>>()
        .into();
    let children: Value = node
        .cnt_vars_children
        .iter()
        .map(|(var, pairs)| {
            let pairs: Vec<Value> = pairs
                .iter()
                .map(|(child, param)| json!([child, param]))
                .collect();
            (var.clone(), Value::Array(pairs))
        })
        .collect::<serde_json::Map<_, _>>()
        .into();

    map.insert(
        node.name.clone(),
        json!({
            "child_nodes": node.children.iter().map(name_of).collect::<Vec<_>>(),
            "parent_nodes": node.parents.iter().map(name_of).collect::<Vec<_>>(),
            "input": node.inputs,
            "output": node.outputs,
            "cnt_vars_parents": parents,
            "cnt_vars_children": children,
        }),
    );
    for &child in &node.children {
        collect_node(graph, child, map, visited);
    }
}

fn emit(value: &Value, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, text).map_err(|e| Error::from_io(e, path))?;
            info!(file = %path.display(), "written");
        }
        None => println!("{}", text),
    }
    Ok(())
}

pub fn tag_command(args: &TagArgs) -> Result<()> {
    let registry = build_registry(&args.code_dir)?;
    info!(functions = registry.len(), "registry built");
    emit(&serde_json::to_value(&registry)?, args.output.as_deref())
}

pub fn graph_command(args: &GraphArgs) -> Result<()> {
    let registry = load_registry(&args.registry)?;
    let (graph, root) = CallGraph::build(&args.root, &registry)?;
    info!(nodes = graph.len(), "call graph built");
    emit(&graph_to_json(&graph, root), args.output.as_deref())
}

pub fn cache_command(args: &CacheArgs) -> Result<()> {
    let registry = load_registry(&args.registry)?;
    let exclusions: BTreeSet<String> = args.exclusions.iter().cloned().collect();
    let selected = select_cacheable(&args.root, &registry, &exclusions)?;
    info!(functions = selected.len(), "cacheable set selected");
    emit(
        &Value::Array(selected.into_iter().map(Value::String).collect()),
        args.output.as_deref(),
    )
}
