//! Resolver registry - which resolver handles which target kind.
//!
//! Lookups match the exact kind only. A kind whose supertype has a
//! resolver is still unresolvable until a resolver is registered for the
//! kind itself.

use std::collections::HashMap;

use crate::core::target::{Target, TargetKind};
use crate::resolver::resolvers::NodeResolver;

#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<TargetKind, Box<dyn NodeResolver>>,
}

impl ResolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ResolverRegistry::default()
    }

    /// Register `resolver` for `kind`, returning the one it replaces.
    pub fn register(
        &mut self,
        kind: TargetKind,
        resolver: Box<dyn NodeResolver>,
    ) -> Option<Box<dyn NodeResolver>> {
        tracing::debug!("registering {} resolver for {}", resolver.name(), kind);
        self.resolvers.insert(kind, resolver)
    }

    /// The resolver registered for exactly `kind`.
    pub fn resolver_for(&self, kind: TargetKind) -> Option<&dyn NodeResolver> {
        self.resolvers.get(&kind).map(|r| r.as_ref())
    }

    /// Whether `target` is a node package with a resolver for its kind.
    pub fn can_resolve(&self, target: &Target) -> bool {
        target.kind().is_node_package() && self.resolvers.contains_key(&target.kind())
    }

    /// Remove every registration.
    pub fn reset(&mut self) {
        self.resolvers.clear();
    }

    /// Registered resolvers, ordered by kind.
    pub fn iter(&self) -> impl Iterator<Item = (TargetKind, &dyn NodeResolver)> {
        let mut entries: Vec<_> = self
            .resolvers
            .iter()
            .map(|(kind, r)| (*kind, r.as_ref()))
            .collect();
        entries.sort_by_key(|(kind, _)| *kind);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(kind, r)| (kind, r.name())))
            .finish()
    }
}
