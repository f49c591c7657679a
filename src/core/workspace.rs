//! Workspace - central configuration hub.
//!
//! A Workspace is the build root together with its configuration and the
//! target graph loaded from its build files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::build_file::load_target_graph;
use crate::core::graph::{TargetGraph, TargetId};
use crate::core::target::Target;
use crate::util::config::{global_config_path, load_config, project_config_path, Config, PROJECT_CONFIG_NAME};
use crate::util::fs::glob_files;
use crate::util::GlobalContext;

/// Name of the private state directory under the build root.
pub const WORK_DIR_NAME: &str = ".quay.d";

/// Name of the distribution output directory under the build root.
pub const DIST_DIR_NAME: &str = "dist";

/// Error locating the build root.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("could not find {PROJECT_CONFIG_NAME} in {} or any parent directory", dir.display())]
    NotFound { dir: PathBuf },
}

/// Walk upward from `start` to the first directory containing `quay.toml`.
pub fn find_build_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_CONFIG_NAME).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| WorkspaceError::NotFound {
            dir: start.to_path_buf(),
        })
}

/// The build root, its configuration and target graph.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    work_dir: PathBuf,
    dist_dir: PathBuf,
    config: Config,
    graph: TargetGraph,
    default_cache_dir: PathBuf,
}

impl Workspace {
    /// Locate the build root from the context's cwd and load everything.
    pub fn load(ctx: &GlobalContext) -> Result<Self> {
        let root = ctx.find_build_root()?;

        let global = global_config_path().unwrap_or_default();
        let config = load_config(&global, &project_config_path(&root));

        let graph = load_target_graph(&root, WORK_DIR_NAME)
            .with_context(|| format!("failed to load build files under {}", root.display()))?;

        tracing::debug!(
            "loaded workspace at {} with {} targets",
            root.display(),
            graph.len()
        );

        Ok(Workspace::from_parts(root, config, graph).with_default_cache_dir(ctx.artifact_cache_dir()))
    }

    /// Assemble a workspace from already loaded parts.
    pub fn from_parts(root: PathBuf, config: Config, graph: TargetGraph) -> Self {
        let work_dir = root.join(WORK_DIR_NAME);
        let dist_dir = root.join(DIST_DIR_NAME);
        let default_cache_dir = work_dir.join("artifact_cache");
        Workspace {
            root,
            work_dir,
            dist_dir,
            config,
            graph,
            default_cache_dir,
        }
    }

    /// Use a different artifact cache location when none is configured.
    pub fn with_default_cache_dir(mut self, dir: PathBuf) -> Self {
        self.default_cache_dir = dir;
        self
    }

    /// Get the build root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the private state directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Get the distribution output directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &TargetGraph {
        &self.graph
    }

    /// Convenience accessor for a target in the graph.
    pub fn target(&self, id: TargetId) -> &Target {
        self.graph.target(id)
    }

    /// Directory holding fingerprint stores.
    pub fn invalidator_dir(&self) -> PathBuf {
        self.work_dir.join("build_invalidator")
    }

    /// Directory holding isolated resolve results.
    pub fn resolve_dir(&self) -> PathBuf {
        self.work_dir.join("resolve")
    }

    /// Artifact cache directory, when caching is enabled.
    pub fn artifact_cache_dir(&self) -> Option<PathBuf> {
        if !self.config.cache_enabled() {
            return None;
        }
        Some(
            self.config
                .cache
                .dir
                .clone()
                .unwrap_or_else(|| self.default_cache_dir.clone()),
        )
    }

    /// The source directory of a target.
    pub fn target_dir(&self, id: TargetId) -> PathBuf {
        self.root.join(self.graph.address_of(id).spec_path())
    }

    /// Absolute paths of a target's sources, sorted.
    pub fn target_sources(&self, id: TargetId) -> Result<Vec<PathBuf>> {
        let target = self.graph.target(id);
        glob_files(&self.target_dir(id), &target.sources)
    }

    /// Look up each spec in the graph.
    pub fn parse_targets(&self, specs: &[String]) -> Result<Vec<TargetId>> {
        specs
            .iter()
            .map(|spec| {
                self.graph
                    .lookup_spec(spec)
                    .with_context(|| format!("invalid target `{}`", spec))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_root(dir: &Path) {
        std::fs::write(dir.join("quay.toml"), "[cache]\nenabled = true\n").unwrap();
        std::fs::create_dir_all(dir.join("src/python/foo")).unwrap();
        std::fs::write(
            dir.join("src/python/foo/BUILD.toml"),
            "[[target]]\nname = \"foo\"\nkind = \"library\"\nsources = [\"*.py\"]\n",
        )
        .unwrap();
        std::fs::write(dir.join("src/python/foo/a.py"), "").unwrap();
        std::fs::write(dir.join("src/python/foo/b.py"), "").unwrap();
        std::fs::write(dir.join("src/python/foo/c.txt"), "").unwrap();
    }

    #[test]
    fn test_workspace_load() {
        let tmp = TempDir::new().unwrap();
        create_test_root(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().join("src/python")).unwrap();

        let ws = Workspace::load(&ctx).unwrap();
        assert_eq!(ws.root(), tmp.path());
        assert_eq!(ws.graph().len(), 1);
        assert!(ws.work_dir().ends_with(".quay.d"));
        assert!(ws.dist_dir().ends_with("dist"));
        assert!(ws.artifact_cache_dir().is_some());

        let foo = ws.parse_targets(&["src/python/foo".to_string()]).unwrap()[0];
        let sources = ws.target_sources(foo).unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_workspace_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = find_build_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("quay.toml"));
    }

    #[test]
    fn test_parse_unknown_target() {
        let tmp = TempDir::new().unwrap();
        create_test_root(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let ws = Workspace::load(&ctx).unwrap();

        let err = ws.parse_targets(&["src/python/foo:nope".to_string()]).unwrap_err();
        assert!(format!("{:#}", err).contains("no target at address"));
    }
}
