//! Resolved node package locations.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::core::graph::TargetId;

/// Target -> directory holding its installed node package.
///
/// Entries are appended as targets finish resolving, so a dependent always
/// finds its dependencies here.
#[derive(Debug, Default, Clone)]
pub struct NodePaths {
    paths: IndexMap<TargetId, PathBuf>,
}

impl NodePaths {
    pub fn new() -> Self {
        NodePaths::default()
    }

    /// Record where `target` was resolved.
    pub fn resolved(&mut self, target: TargetId, node_path: PathBuf) {
        self.paths.insert(target, node_path);
    }

    /// The directory `target` was resolved into, if it was.
    pub fn node_path(&self, target: TargetId) -> Option<&Path> {
        self.paths.get(&target).map(PathBuf::as_path)
    }

    /// All resolved directories, in resolution order.
    pub fn all_node_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Path)> {
        self.paths.iter().map(|(id, path)| (*id, path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::GraphFixture;

    #[test]
    fn test_node_paths_keep_resolution_order() {
        let mut fx = GraphFixture::new();
        fx.node_module("a", &[]);
        fx.node_module("b", &[]);
        let graph = fx.build();
        let a = graph.lookup_spec("a").unwrap();
        let b = graph.lookup_spec("b").unwrap();

        let mut paths = NodePaths::new();
        assert!(paths.is_empty());
        paths.resolved(b, PathBuf::from("/r/b"));
        paths.resolved(a, PathBuf::from("/r/a"));

        assert_eq!(paths.node_path(a), Some(Path::new("/r/a")));
        assert_eq!(
            paths.all_node_paths().collect::<Vec<_>>(),
            vec![Path::new("/r/b"), Path::new("/r/a")]
        );
        assert_eq!(paths.len(), 2);
    }
}
