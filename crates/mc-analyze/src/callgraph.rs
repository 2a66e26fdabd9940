//! Cross-file call-graph construction.
//!
//! Starting from a root file, every call site whose callee is present in the
//! signature registry is followed into the callee's file, depth first. The
//! graph keeps one node per distinct function name; a revisit reuses the
//! existing node and contributes edges but is not descended again, which is
//! what makes recursion and diamond call patterns terminate.
//!
//! Edges carry positional variable pairings in both directions: caller
//! argument against declared callee input, and declared callee output against
//! the call site's assignment target. When a call feeds an enclosing
//! expression instead of a bare assignment, the callee output is paired with
//! the whole statement's target and flagged as derived.

use mc_core::registry::SignatureRegistry;
use mc_core::{Error, Result};
use mc_parser::assembler::Statements;
use mc_parser::decompose::{compose, decompose};
use mc_parser::signature::{call_attributes, split_assignment, CallSite};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Index of a node inside one [`CallGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One callee-output pairing recorded on a parent edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Calling function.
    pub func: String,
    /// Variable name on the caller side; the statement-level target when
    /// `derived` is set.
    pub var: String,
    /// True when the call result flowed into an enclosing expression rather
    /// than being bound directly.
    pub derived: bool,
}

impl ParentRef {
    /// Caller-side name in the persisted format, `name(@)` when derived.
    pub fn render(&self) -> String {
        if self.derived {
            format!("{}(@)", self.var)
        } else {
            self.var.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
    /// Local variable passed as an argument -> (callee name, callee input).
    pub cnt_vars_children: BTreeMap<String, Vec<(String, String)>>,
    /// Own output name -> pairings with each caller.
    pub cnt_vars_parents: BTreeMap<String, Vec<ParentRef>>,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<FunctionNode>,
    by_name: HashMap<String, NodeId>,
}

impl CallGraph {
    /// Build the graph rooted at `root`. A missing root file is fatal;
    /// missing callee files are logged and left as leaves.
    pub fn build(root: &Path, registry: &SignatureRegistry) -> Result<(CallGraph, NodeId)> {
        let mut graph = CallGraph::default();
        let name = file_function_name(root);
        let (root_id, _) = graph.ensure_node(&name, registry);
        graph.expand(root_id, root, registry)?;
        Ok((graph, root_id))
    }

    pub fn node(&self, id: NodeId) -> &FunctionNode {
        &self.nodes[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &FunctionNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    fn ensure_node(&mut self, name: &str, registry: &SignatureRegistry) -> (NodeId, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }
        let (inputs, outputs) = registry
            .get(name)
            .map(|sig| (sig.inputs.clone(), sig.outputs.clone()))
            .unwrap_or_default();
        let id = NodeId(self.nodes.len());
        self.nodes.push(FunctionNode {
            name: name.to_string(),
            inputs,
            outputs,
            ..FunctionNode::default()
        });
        self.by_name.insert(name.to_string(), id);
        (id, true)
    }

    fn expand(&mut self, id: NodeId, path: &Path, registry: &SignatureRegistry) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        debug!(function = %self.nodes[id.0].name, file = %path.display(), "expand call-graph node");

        for stmt in Statements::new(&source) {
            let (sites, top_outputs) = statement_call_sites(&stmt.text);
            for site in sites {
                if !registry.contains(&site.name) {
                    continue;
                }
                let (child, is_new) = self.ensure_node(&site.name, registry);
                self.connect(id, child, &site, &top_outputs, path, stmt.line_index)?;
                if is_new {
                    let child_path = dir.join(format!("{}.m", site.name));
                    match self.expand(child, &child_path, registry) {
                        Err(e) if e.is_file_not_found() => {
                            warn!(
                                callee = %site.name,
                                file = %child_path.display(),
                                "callee file missing, kept as leaf"
                            );
                        }
                        other => other?,
                    }
                }
            }
        }
        Ok(())
    }

    fn connect(
        &mut self,
        caller: NodeId,
        callee: NodeId,
        site: &CallSite,
        top_outputs: &[String],
        file: &Path,
        line: u32,
    ) -> Result<()> {
        let callee_inputs = self.nodes[callee.0].inputs.clone();
        let callee_outputs = self.nodes[callee.0].outputs.clone();
        let callee_name = self.nodes[callee.0].name.clone();
        let caller_name = self.nodes[caller.0].name.clone();

        if site.inputs.len() > callee_inputs.len() {
            return Err(Error::ArityMismatch {
                file: file.to_path_buf(),
                line: line + 1,
                message: format!(
                    "{} passes {} arguments but `{}` declares {} inputs",
                    caller_name,
                    site.inputs.len(),
                    callee_name,
                    callee_inputs.len()
                ),
            });
        }
        if site.outputs.len() > callee_outputs.len() {
            return Err(Error::ArityMismatch {
                file: file.to_path_buf(),
                line: line + 1,
                message: format!(
                    "{} binds {} targets but `{}` declares {} outputs",
                    caller_name,
                    site.outputs.len(),
                    callee_name,
                    callee_outputs.len()
                ),
            });
        }

        let parent_node = &mut self.nodes[caller.0];
        parent_node.children.push(callee);
        for (local, param) in site.inputs.iter().zip(callee_inputs.iter()) {
            parent_node
                .cnt_vars_children
                .entry(local.clone())
                .or_default()
                .push((callee_name.clone(), param.clone()));
        }

        let child_node = &mut self.nodes[callee.0];
        child_node.parents.push(caller);
        for (ind, output) in callee_outputs.iter().enumerate() {
            let reference = if site.outputs.is_empty() {
                // nested call: the result is only bound through the
                // statement's own target
                let Some(top) = top_outputs.get(ind) else {
                    continue;
                };
                ParentRef {
                    func: caller_name.clone(),
                    var: top.clone(),
                    derived: true,
                }
            } else {
                let Some(target) = site.outputs.get(ind) else {
                    continue;
                };
                ParentRef {
                    func: caller_name.clone(),
                    var: target.clone(),
                    derived: false,
                }
            };
            child_node
                .cnt_vars_parents
                .entry(output.clone())
                .or_default()
                .push(reference);
        }
        Ok(())
    }
}

/// Function name a file defines, by convention its stem (`my_slope.m` ->
/// `my_slope`).
pub fn file_function_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every call site of one statement, innermost first, plus the statement's
/// own assignment targets. Argument texts are re-composed so nested calls
/// appear verbatim; the outermost site inherits the statement targets as its
/// outputs. Callee names are not checked against anything here, so slice
/// reads of bound variables also surface and must be filtered by the caller.
pub fn statement_call_sites(stmt: &str) -> (Vec<CallSite>, Vec<String>) {
    let Some(top) = call_attributes(stmt) else {
        return (Vec::new(), Vec::new());
    };
    let (_, right) = split_assignment(stmt);
    let (map, _) = decompose(right);
    let mut sites = Vec::new();
    for (_, value) in map.iter() {
        let Some(mut site) = call_attributes(value) else {
            continue;
        };
        site.inputs = site.inputs.iter().map(|arg| compose(arg, &map)).collect();
        if site.name == top.name {
            site.outputs = top.outputs.clone();
        }
        sites.push(site);
    }
    (sites, top.outputs)
}
