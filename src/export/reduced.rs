//! Reduced dependencies of a published target.
//!
//! The reduced set is what a published target's distribution must declare
//! or carry: other published targets it reaches, third-party requirement
//! targets, and the unpublished sources it owns itself (including binaries
//! folded in through `provides`). Unpublished sources owned by some other
//! published target are replaced by that owner.

use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::core::graph::{TargetGraph, TargetId};
use crate::core::target::TargetKind;
use crate::export::errors::ExportError;
use crate::export::ownership::{walk, OwnershipResolver};

/// Computes reduced dependency sets, memoized per published target.
pub struct DependencyCalculator<'g> {
    ownership: OwnershipResolver<'g>,
    reduced: RefCell<HashMap<TargetId, IndexSet<TargetId>>>,
}

impl<'g> DependencyCalculator<'g> {
    pub fn new(graph: &'g TargetGraph) -> Self {
        DependencyCalculator {
            ownership: OwnershipResolver::new(graph),
            reduced: RefCell::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &'g TargetGraph {
        self.ownership.graph()
    }

    /// Owner lookup sharing this calculator's memo tables.
    pub fn ownership(&self) -> &OwnershipResolver<'g> {
        &self.ownership
    }

    /// The reduced dependency set of `published`, in discovery order.
    pub fn reduced_dependencies(&self, published: TargetId) -> Result<IndexSet<TargetId>, ExportError> {
        if let Some(cached) = self.reduced.borrow().get(&published) {
            return Ok(cached.clone());
        }

        let reduced = self.compute(published)?;
        self.reduced
            .borrow_mut()
            .insert(published, reduced.clone());
        Ok(reduced)
    }

    fn compute(&self, root: TargetId) -> Result<IndexSet<TargetId>, ExportError> {
        let graph = self.graph();
        if !graph.target(root).is_published() {
            return Err(ExportError::NotPublished {
                target: graph.address_of(root).clone(),
            });
        }

        // Everything reachable without crossing into another published target.
        let mut collected = Vec::new();
        walk(graph, root, |current| {
            collected.push(current);
            current == root || !graph.target(current).is_published()
        });

        let mut owners: HashMap<TargetId, TargetId> = HashMap::new();
        for &id in &collected {
            let target = graph.target(id);
            if target.kind().requires_export() && !target.is_published() {
                owners.insert(id, self.ownership.owner_of(id)?);
            }
        }

        let mut reduced = IndexSet::new();
        walk(graph, root, |current| {
            if current == root {
                return true;
            }
            let owner = owners.get(&current).copied();
            match owner {
                Some(owner) if owner != root => {
                    reduced.insert(owner);
                }
                _ => {
                    reduced.insert(current);
                }
            }
            owner == Some(root) || !graph.target(current).kind().requires_export()
        });

        tracing::debug!(
            "reduced dependencies of `{}`: [{}]",
            graph.address_of(root),
            reduced
                .iter()
                .map(|id| graph.address_of(*id).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(reduced)
    }

    /// Console scripts of a published target: binary name -> entry point.
    pub fn iter_entry_points(&self, published: TargetId) -> Result<IndexMap<String, String>, ExportError> {
        entry_points(self.graph(), published)
    }
}

/// Requirement strings a distribution with the given reduced set declares.
///
/// Published members contribute `name==version`; requirement targets
/// contribute their requirement strings verbatim.
pub fn install_requires(graph: &TargetGraph, reduced: &IndexSet<TargetId>) -> IndexSet<String> {
    let mut requires = IndexSet::new();
    for &id in reduced {
        let target = graph.target(id);
        if let Some(provides) = &target.provides {
            requires.insert(provides.key());
        } else if target.kind() == TargetKind::Requirement {
            requires.extend(target.requirements().iter().cloned());
        }
    }
    requires
}

/// Console scripts of a published target: binary name -> entry point.
pub fn entry_points(graph: &TargetGraph, published: TargetId) -> Result<IndexMap<String, String>, ExportError> {
    let target = graph.target(published);
    let provides = target.provides.as_ref().ok_or_else(|| ExportError::NotPublished {
        target: target.address.clone(),
    })?;

    let mut entry_points = IndexMap::new();
    for ((name, address), &binary) in provides.binaries.iter().zip(graph.provided_binaries(published)) {
        let binary_target = graph.target(binary);
        let invalid = |reason: &str| ExportError::InvalidBinary {
            owner: target.address.clone(),
            name: name.clone(),
            binary: address.clone(),
            reason: reason.to_string(),
        };

        if binary_target.kind() != TargetKind::Binary {
            return Err(invalid("is not a binary target"));
        }
        let entry_point = binary_target
            .entry_point()
            .ok_or_else(|| invalid("has no entry point"))?;
        entry_points.insert(name.clone(), entry_point.to_string());
    }
    Ok(entry_points)
}
