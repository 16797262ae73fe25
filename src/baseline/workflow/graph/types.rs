// SPDX-License-Identifier: MIT

//! Dependency graph type definitions
//!
//! Nodes are rules, identified by their declaration index. An edge from `a`
//! to `b` means `a` waits for `b` to finish, successfully or not.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::normalizer::chain_sequential_lane;
use crate::sdk::error::{CycleError, ValidationError};

/// What the graph builder needs to know about one rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSpec {
    pub name: String,
    pub depends_on: Vec<String>,
    /// Runs on the exclusive lane
    pub sequential: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn depends_on(mut self, rule: impl Into<String>) -> Self {
        self.depends_on.push(rule.into());
        self
    }

    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }
}

/// Validated, acyclic dependency graph
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// Declared `DependsOn` edges, duplicates collapsed
    dependencies: Vec<Vec<usize>>,
    /// Declared edges plus the implicit edges of the sequential lane
    waits_for: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    sequential: Vec<bool>,
    order: Vec<usize>, // Topological, ties broken by declaration index
}

impl DependencyGraph {
    /// Build the graph, reporting duplicate names, unknown dependencies and
    /// every cycle found.
    ///
    /// Empty names are skipped here; they are reported as missing fields.
    pub fn build(nodes: &[NodeSpec]) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if node.name.is_empty() {
                continue;
            }
            match index.get(&node.name) {
                Some(&first_index) => errors.push(ValidationError::DuplicateRuleName {
                    field: format!("Rules[{}].RuleName", i),
                    name: node.name.clone(),
                    first_index,
                }),
                None => {
                    index.insert(node.name.clone(), i);
                }
            }
        }

        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for (k, dependency) in node.depends_on.iter().enumerate() {
                match index.get(dependency) {
                    Some(&j) => {
                        if !dependencies[i].contains(&j) {
                            dependencies[i].push(j);
                        }
                    }
                    None => errors.push(ValidationError::UnknownDependency {
                        field: format!("Rules[{}].Execution.DependsOn[{}]", i, k),
                        rule: node.name.clone(),
                        dependency: dependency.clone(),
                    }),
                }
            }
        }

        for cycle in find_cycles(&dependencies) {
            errors.push(ValidationError::Cycle(CycleError {
                rules: cycle.iter().map(|&i| nodes[i].name.clone()).collect(),
            }));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let sequential: Vec<bool> = nodes.iter().map(|n| n.sequential).collect();
        let order = topological_order(&dependencies);
        let waits_for = chain_sequential_lane(&dependencies, &order, &sequential);

        let mut dependents = vec![Vec::new(); nodes.len()];
        for (i, targets) in waits_for.iter().enumerate() {
            for &j in targets {
                dependents[j].push(i);
            }
        }

        Ok(Self {
            names: nodes.iter().map(|n| n.name.clone()).collect(),
            index,
            dependencies,
            waits_for,
            dependents,
            sequential,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Rules `node` declared in `DependsOn`
    pub fn dependencies(&self, node: usize) -> &[usize] {
        &self.dependencies[node]
    }

    /// Rules that must finish before `node` may start
    pub fn waits_for(&self, node: usize) -> &[usize] {
        &self.waits_for[node]
    }

    /// Rules waiting on `node`
    pub fn dependents(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    pub fn is_sequential(&self, node: usize) -> bool {
        self.sequential[node]
    }

    /// Every node in dependency order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Rule names in dependency order
    pub fn ordered_names(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.names[i].as_str()).collect()
    }
}

/// Kahn's algorithm; among ready nodes the earliest declared goes first
fn topological_order(edges: &[Vec<usize>]) -> Vec<usize> {
    let mut pending: Vec<usize> = edges.iter().map(|e| e.len()).collect();
    let mut dependents = vec![Vec::new(); edges.len()];
    for (i, targets) in edges.iter().enumerate() {
        for &j in targets {
            dependents[j].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, &count)| count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(edges.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &dependent in &dependents[node] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first search with path marking. Each cycle is reported once,
/// rotated to start at its earliest declared member.
fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut cycles = Vec::new();

    for root in 0..edges.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        let mut path: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = path.last_mut() {
            let node = frame.0;
            let Some(&target) = edges[node].get(frame.1) else {
                marks[node] = Mark::Done;
                path.pop();
                continue;
            };
            frame.1 += 1;

            match marks[target] {
                Mark::Unvisited => {
                    marks[target] = Mark::OnPath;
                    path.push((target, 0));
                }
                Mark::OnPath => {
                    let start = path.iter().position(|&(n, _)| n == target).unwrap_or(0);
                    let mut members: Vec<usize> = path[start..].iter().map(|&(n, _)| n).collect();
                    let mut key = members.clone();
                    key.sort_unstable();
                    if seen.insert(key) {
                        let first = members
                            .iter()
                            .enumerate()
                            .min_by_key(|(_, &n)| n)
                            .map(|(pos, _)| pos)
                            .unwrap_or(0);
                        members.rotate_left(first);
                        cycles.push(members);
                    }
                }
                Mark::Done => {}
            }
        }
    }

    cycles
}
