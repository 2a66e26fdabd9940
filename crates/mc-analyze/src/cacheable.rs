//! Cacheable-variable selection.
//!
//! A sub-function result is safe to memoize when it is produced at most once
//! along any execution path outside loops: the producing call must sit
//! directly in the top-level function block, and the same callee must not
//! produce a second top-level value in the same file. Selection recurses
//! into each surviving callee to find further once-called candidates.

use crate::flow::{analyze_file, FileFlow};
use mc_core::binding::{VarId, VarRole};
use mc_core::registry::SignatureRegistry;
use mc_core::Result;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Registered callees producing exactly one top-level, non-loop value in
/// this file, in first-call order. A second production by the same callee
/// removes it again: two productions mean the value is not a single cache
/// key.
pub fn once_called_targets(
    flow: &FileFlow,
    registry: &SignatureRegistry,
    exclusions: &BTreeSet<String>,
) -> Vec<String> {
    let Some(top) = flow.top_block() else {
        return Vec::new();
    };
    let mut called: Vec<String> = Vec::new();
    for binding in &flow.bindings {
        if binding.block != Some(top) || binding.in_loop {
            continue;
        }
        for production in &binding.productions {
            // a slice assignment inside a loop extends a top-level binding;
            // the production still runs once per iteration
            if production.in_loop {
                continue;
            }
            let Some(target) = production.call_target() else {
                continue;
            };
            if !registry.contains(target) || exclusions.contains(target) {
                continue;
            }
            if let Some(pos) = called.iter().position(|name| name == target) {
                called.remove(pos);
            } else {
                called.push(target.to_string());
            }
        }
    }
    called
}

/// Names of the functions whose results are safe to cache, starting from
/// `root` and following once-called callees transitively. The root's own
/// name is pre-seeded as visited so self-recursion never qualifies it.
pub fn select_cacheable(
    root: &Path,
    registry: &SignatureRegistry,
    exclusions: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    let mut visited = BTreeSet::new();
    visited.insert(crate::callgraph::file_function_name(root));
    let mut selected = BTreeSet::new();
    visit(root, registry, exclusions, &mut visited, &mut selected)?;
    Ok(selected)
}

fn visit(
    path: &Path,
    registry: &SignatureRegistry,
    exclusions: &BTreeSet<String>,
    visited: &mut BTreeSet<String>,
    selected: &mut BTreeSet<String>,
) -> Result<()> {
    let flow = analyze_file(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    for target in once_called_targets(&flow, registry, exclusions) {
        // a name reached through an earlier path is not re-descended
        if !visited.insert(target.clone()) {
            continue;
        }
        debug!(function = %target, "cacheable candidate");
        selected.insert(target.clone());
        let target_path = dir.join(format!("{}.m", target));
        match visit(&target_path, registry, exclusions, visited, selected) {
            Err(e) if e.is_file_not_found() => {
                warn!(
                    function = %target,
                    file = %target_path.display(),
                    "candidate file missing, not recursed"
                );
            }
            other => other?,
        }
    }
    Ok(())
}

/// One file's cacheable bindings, in creation order, for the code-generation
/// layer: top-level, used, whole-value bindings produced by a call into
/// `valid`. Their production line indices tell the generator where to splice
/// cache checks.
pub fn select_cacheable_bindings(
    flow: &FileFlow,
    valid: &BTreeSet<String>,
    exclusions: &BTreeSet<String>,
) -> Vec<VarId> {
    let Some(top) = flow.top_block() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for binding in &flow.bindings {
        if binding.block != Some(top)
            || binding.role == VarRole::Input
            || !binding.is_used()
            || binding.is_slice_produced()
        {
            continue;
        }
        let qualified = binding.productions.iter().any(|p| {
            p.call_target()
                .map(|t| valid.contains(t) && !exclusions.contains(t))
                .unwrap_or(false)
        });
        if qualified {
            out.push(binding.id);
        }
    }
    out
}
