use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared inputs and outputs of one function, as found in its
/// `function [out..] = name(in..)` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    #[serde(rename = "input")]
    pub inputs: Vec<String>,
    #[serde(rename = "output")]
    pub outputs: Vec<String>,
}

impl FunctionSignature {
    pub fn new(inputs: Vec<String>, outputs: Vec<String>) -> Self {
        Self { inputs, outputs }
    }
}

/// Read-only lookup of known sub-function signatures, keyed by function name.
/// Built externally (the `tag` pass) and consumed in memory by the call-graph
/// builder and the cacheability selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureRegistry {
    entries: BTreeMap<String, FunctionSignature>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, signature: FunctionSignature) {
        self.entries.insert(name.into(), signature);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionSignature)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
