//! Ownership - which published target packages a given target's sources.
//!
//! The owner of a non-published target is found by searching its address
//! ancestry outward: its own directory first, then each parent up to the
//! build root. At each level the candidates are the published targets whose
//! export closure contains the target. The first level with any candidate
//! decides; more than one candidate there is ambiguous.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::core::graph::{TargetGraph, TargetId};
use crate::export::errors::ExportError;

/// Edges followed when computing exports: declared dependencies, then (for
/// published targets) the provided binaries, each in declaration order.
pub fn export_dependencies(graph: &TargetGraph, id: TargetId) -> Vec<TargetId> {
    let mut deps = graph.dependencies_of(id).to_vec();
    if graph.target(id).is_published() {
        for &binary in graph.provided_binaries(id) {
            if !deps.contains(&binary) {
                deps.push(binary);
            }
        }
    }
    deps
}

/// Depth-first pre-order walk over export edges, visiting each target once.
///
/// `visitor` is called for every newly reached target, the root included,
/// and returns whether to descend into that target's dependencies.
pub fn walk(graph: &TargetGraph, root: TargetId, mut visitor: impl FnMut(TargetId) -> bool) {
    let mut visited = HashSet::new();
    let mut stack: Vec<std::vec::IntoIter<TargetId>> = Vec::new();

    visited.insert(root);
    if visitor(root) {
        stack.push(export_dependencies(graph, root).into_iter());
    }

    loop {
        let next = match stack.last_mut() {
            Some(deps) => deps.next(),
            None => break,
        };
        match next {
            Some(id) => {
                if visited.insert(id) && visitor(id) {
                    stack.push(export_dependencies(graph, id).into_iter());
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Memoizing owner lookup over one graph snapshot.
pub struct OwnershipResolver<'g> {
    graph: &'g TargetGraph,
    closures: RefCell<HashMap<TargetId, Rc<HashSet<TargetId>>>>,
    owners: RefCell<HashMap<TargetId, TargetId>>,
}

impl<'g> OwnershipResolver<'g> {
    pub fn new(graph: &'g TargetGraph) -> Self {
        OwnershipResolver {
            graph,
            closures: RefCell::new(HashMap::new()),
            owners: RefCell::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &'g TargetGraph {
        self.graph
    }

    /// Every target reachable from `id` over export edges, `id` included.
    pub fn closure(&self, id: TargetId) -> Rc<HashSet<TargetId>> {
        if let Some(cached) = self.closures.borrow().get(&id) {
            return Rc::clone(cached);
        }

        let mut closure = HashSet::new();
        walk(self.graph, id, |current| {
            closure.insert(current);
            true
        });

        let closure = Rc::new(closure);
        self.closures.borrow_mut().insert(id, Rc::clone(&closure));
        closure
    }

    /// The published target that packages `id`.
    ///
    /// A published target owns itself.
    pub fn owner_of(&self, id: TargetId) -> Result<TargetId, ExportError> {
        if self.graph.target(id).is_published() {
            return Ok(id);
        }
        if let Some(&owner) = self.owners.borrow().get(&id) {
            return Ok(owner);
        }

        let owner = self.search_owner(id)?;
        self.owners.borrow_mut().insert(id, owner);
        Ok(owner)
    }

    fn search_owner(&self, id: TargetId) -> Result<TargetId, ExportError> {
        let address = self.graph.address_of(id);

        for spec_path in address.ancestor_spec_paths() {
            let mut candidates: Vec<TargetId> = self
                .graph
                .targets_in_spec_path(spec_path)
                .iter()
                .copied()
                .filter(|&candidate| self.graph.target(candidate).is_published())
                .filter(|&candidate| self.closure(candidate).contains(&id))
                .collect();

            match candidates.len() {
                0 => continue,
                1 => {
                    let owner = candidates[0];
                    tracing::debug!(
                        "`{}` is owned by `{}`",
                        address,
                        self.graph.address_of(owner)
                    );
                    return Ok(owner);
                }
                _ => {
                    candidates.sort_by(|a, b| {
                        self.graph.address_of(*a).cmp(self.graph.address_of(*b))
                    });
                    return Err(ExportError::AmbiguousOwner {
                        target: address.clone(),
                        owners: candidates
                            .into_iter()
                            .map(|c| self.graph.address_of(c).clone())
                            .collect(),
                    });
                }
            }
        }

        Err(ExportError::NoOwner {
            target: address.clone(),
        })
    }
}
