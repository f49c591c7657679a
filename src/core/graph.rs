//! TargetGraph - the immutable build graph snapshot.
//!
//! Targets live in an arena and are referred to by [`TargetId`]. Once built,
//! a graph is read-only; every traversal in the crate borrows it.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use thiserror::Error;

use crate::core::address::{Address, AddressError};
use crate::core::target::Target;

/// Index of a target inside a [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Error constructing or querying the build graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate target address `{address}`")]
    DuplicateAddress { address: Address },

    #[error("`{target}` depends on unknown target `{dependency}`")]
    UnknownDependency { target: Address, dependency: Address },

    #[error("no target at address `{address}`")]
    UnknownAddress { address: Address },

    #[error("cycle detected in target graph at `{target}`")]
    Cycle { target: Address },

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("invalid build file {path}: {message}")]
    BuildFile { path: String, message: String },
}

/// Collects targets and edges before freezing them into a [`TargetGraph`].
#[derive(Debug, Default)]
pub struct TargetGraphBuilder {
    targets: Vec<Target>,
}

impl TargetGraphBuilder {
    pub fn new() -> Self {
        TargetGraphBuilder::default()
    }

    /// Add a target. Dependencies may name targets added later.
    pub fn add(&mut self, target: Target) -> &mut Self {
        self.targets.push(target);
        self
    }

    /// Append a dependency edge `from -> to` to an already added target.
    pub fn inject_dependency(&mut self, from: &Address, to: &Address) -> Result<(), GraphError> {
        let target = self
            .targets
            .iter_mut()
            .find(|t| &t.address == from)
            .ok_or_else(|| GraphError::UnknownAddress {
                address: from.clone(),
            })?;
        if !target.dependencies.contains(to) {
            target.dependencies.push(to.clone());
        }
        Ok(())
    }

    /// Resolve every edge and reject duplicates, dangling edges and cycles.
    pub fn build(self) -> Result<TargetGraph, GraphError> {
        let mut by_address = HashMap::with_capacity(self.targets.len());
        let mut by_spec_path: BTreeMap<String, Vec<TargetId>> = BTreeMap::new();

        for (idx, target) in self.targets.iter().enumerate() {
            let id = TargetId(idx);
            if by_address.insert(target.address.clone(), id).is_some() {
                return Err(GraphError::DuplicateAddress {
                    address: target.address.clone(),
                });
            }
            by_spec_path
                .entry(target.address.spec_path().to_string())
                .or_default()
                .push(id);
        }

        let lookup = |owner: &Target, dep: &Address| -> Result<TargetId, GraphError> {
            by_address
                .get(dep)
                .copied()
                .ok_or_else(|| GraphError::UnknownDependency {
                    target: owner.address.clone(),
                    dependency: dep.clone(),
                })
        };

        let mut dependencies = Vec::with_capacity(self.targets.len());
        let mut binaries = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let deps = target
                .dependencies
                .iter()
                .map(|dep| lookup(target, dep))
                .collect::<Result<Vec<_>, _>>()?;
            dependencies.push(deps);

            let bins = match &target.provides {
                Some(provides) => provides
                    .binaries
                    .values()
                    .map(|bin| lookup(target, bin))
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            binaries.push(bins);
        }

        let mut graph = DiGraph::with_capacity(self.targets.len(), 0);
        for idx in 0..self.targets.len() {
            graph.add_node(TargetId(idx));
        }
        for (idx, deps) in dependencies.iter().enumerate() {
            for dep in deps {
                graph.add_edge(NodeIndex::new(idx), NodeIndex::new(dep.0), ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let id = graph[cycle.node_id()];
            return Err(GraphError::Cycle {
                target: self.targets[id.0].address.clone(),
            });
        }

        tracing::debug!("built target graph with {} targets", self.targets.len());

        Ok(TargetGraph {
            targets: self.targets,
            by_address,
            by_spec_path,
            dependencies,
            binaries,
            graph,
        })
    }
}

/// An immutable snapshot of all targets and their dependency edges.
#[derive(Debug)]
pub struct TargetGraph {
    targets: Vec<Target>,
    by_address: HashMap<Address, TargetId>,
    by_spec_path: BTreeMap<String, Vec<TargetId>>,
    dependencies: Vec<Vec<TargetId>>,
    binaries: Vec<Vec<TargetId>>,
    graph: DiGraph<TargetId, ()>,
}

impl TargetGraph {
    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Get a target by id.
    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }

    pub fn address_of(&self, id: TargetId) -> &Address {
        &self.targets[id.0].address
    }

    /// Find a target id by address.
    pub fn id_of(&self, address: &Address) -> Option<TargetId> {
        self.by_address.get(address).copied()
    }

    /// Find a target id by address, failing if absent.
    pub fn lookup(&self, address: &Address) -> Result<TargetId, GraphError> {
        self.id_of(address).ok_or_else(|| GraphError::UnknownAddress {
            address: address.clone(),
        })
    }

    /// Parse a spec and look it up.
    pub fn lookup_spec(&self, spec: &str) -> Result<TargetId, GraphError> {
        let address = Address::parse(spec)?;
        self.lookup(&address)
    }

    /// Declared dependencies in declaration order.
    pub fn dependencies_of(&self, id: TargetId) -> &[TargetId] {
        &self.dependencies[id.0]
    }

    /// Binary targets folded into a published target, in declaration order.
    pub fn provided_binaries(&self, id: TargetId) -> &[TargetId] {
        &self.binaries[id.0]
    }

    /// Targets declared in one directory, in declaration order.
    pub fn targets_in_spec_path(&self, spec_path: &str) -> &[TargetId] {
        self.by_spec_path
            .get(spec_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over all targets.
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(idx, target)| (TargetId(idx), target))
    }

    /// The roots plus everything reachable through declared dependencies.
    pub fn transitive_closure(&self, roots: &[TargetId]) -> HashSet<TargetId> {
        let mut closure = HashSet::new();
        for root in roots {
            let mut dfs = Dfs::new(&self.graph, NodeIndex::new(root.0));
            while let Some(node) = dfs.next(&self.graph) {
                closure.insert(self.graph[node]);
            }
        }
        closure
    }

    /// Order `ids` so that every target follows all of its dependencies.
    ///
    /// The walk is a depth-first post-order over declared dependency order,
    /// starting from `ids` in the given order, so the result is stable for a
    /// given snapshot. Ordering constraints through targets outside `ids`
    /// are honored even though those targets are not emitted.
    pub fn topological_order(&self, ids: &[TargetId]) -> Vec<TargetId> {
        let wanted: HashSet<TargetId> = ids.iter().copied().collect();
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(ids.len());

        for &root in ids {
            if visited.contains(&root) {
                continue;
            }
            // Explicit stack of (node, next dependency index) for post-order.
            let mut stack = vec![(root, 0usize)];
            visited.insert(root);
            while let Some((node, next)) = stack.pop() {
                let deps = self.dependencies_of(node);
                if next < deps.len() {
                    stack.push((node, next + 1));
                    let dep = deps[next];
                    if visited.insert(dep) {
                        stack.push((dep, 0));
                    }
                } else if wanted.contains(&node) {
                    order.push(node);
                }
            }
        }

        order
    }
}
