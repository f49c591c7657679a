//! Topological resolve executor with progress reporting.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::graph::TargetId;
use crate::resolver::artifact_cache::ArtifactCache;
use crate::resolver::errors::ResolveError;
use crate::resolver::invalidation::InvalidationOracle;
use crate::resolver::node_paths::NodePaths;
use crate::resolver::registry::ResolverRegistry;
use crate::resolver::resolvers::{ResolveContext, ResolveOptions};
use crate::util::fs::{ensure_dir, recreate_dir};

/// Where results go and how caching behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Results under `<workdir>/resolve/<target-id>/<fingerprint>`, cached.
    Isolated,
    /// Results in each target's source directory, always re-resolved.
    Local,
}

/// Lifecycle of one target during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    Valid,
    Invalid,
    Resolving,
    Resolved,
    /// Restored from the artifact cache
    Restored,
    Failed,
}

/// Outcome of a successful run.
#[derive(Debug, Default)]
pub struct ResolveReport {
    /// Final state of every resolvable target, in resolution order
    pub states: IndexMap<TargetId, TargetState>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl ResolveReport {
    /// Targets in `state`, in resolution order.
    pub fn with_state(&self, state: TargetState) -> Vec<TargetId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| *id)
            .collect()
    }

    /// One-line outcome, e.g. `Finished 2 target(s) in 0.31s (1 up to date)`.
    pub fn summary(&self) -> String {
        let resolved = self.with_state(TargetState::Resolved).len()
            + self.with_state(TargetState::Restored).len();
        format!(
            "Finished {} target(s) in {:.2}s ({} up to date)",
            resolved,
            self.elapsed.as_secs_f64(),
            self.with_state(TargetState::Valid).len()
        )
    }
}

/// Resolves node packages in dependency order.
pub struct ResolveExecutor<'a> {
    ctx: ResolveContext<'a>,
    registry: &'a ResolverRegistry,
    mode: ResolveMode,
    options: ResolveOptions,
    cache: Option<ArtifactCache>,
    verbose: bool,
}

impl<'a> ResolveExecutor<'a> {
    pub fn new(ctx: ResolveContext<'a>, registry: &'a ResolverRegistry, mode: ResolveMode) -> Self {
        let config = ctx.workspace.config();
        let (options, cache) = match mode {
            ResolveMode::Isolated => (
                ResolveOptions::isolated(config),
                ctx.workspace.artifact_cache_dir().map(ArtifactCache::new),
            ),
            ResolveMode::Local => (ResolveOptions::local(), None),
        };
        ResolveExecutor {
            ctx,
            registry,
            mode,
            options,
            cache,
            verbose: false,
        }
    }

    /// Arguments handed through to every resolver.
    pub fn passthru(mut self, passthru: Vec<String>) -> Self {
        self.options = self.options.with_passthru(passthru);
        self
    }

    /// Enable verbose output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    /// Resolve every resolvable target reachable from `roots`.
    ///
    /// Each target is recorded in `node_paths` as soon as it is valid, so a
    /// failure leaves the already-finished targets in place.
    pub fn execute(
        &self,
        roots: &[TargetId],
        oracle: &mut dyn InvalidationOracle,
        node_paths: &mut NodePaths,
    ) -> Result<ResolveReport> {
        let start = Instant::now();
        let ws = self.ctx.workspace;
        let graph = ws.graph();

        let mut candidates: Vec<TargetId> = graph
            .transitive_closure(roots)
            .into_iter()
            .filter(|&id| self.registry.can_resolve(graph.target(id)))
            .collect();
        candidates.sort();
        let ordered = graph.topological_order(&candidates);

        let mut report = ResolveReport::default();
        if ordered.is_empty() {
            tracing::debug!("nothing to resolve");
            return Ok(report);
        }
        for &id in &ordered {
            report.states.insert(id, TargetState::Pending);
        }

        for (kind, resolver) in self.registry.iter() {
            tracing::debug!("preparing {} resolver for {}", resolver.name(), kind);
            resolver.prepare(&self.ctx)?;
        }

        if self.mode == ResolveMode::Local {
            oracle.invalidate_all()?;
        }

        let pb = if !self.verbose && ordered.len() > 1 {
            let pb = ProgressBar::new(ordered.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut fingerprints: HashMap<TargetId, String> = HashMap::new();
        let mut changed: HashSet<TargetId> = HashSet::new();

        let result = ordered.iter().try_for_each(|&id| {
            let address = graph.address_of(id);
            if let Some(pb) = &pb {
                pb.set_message(address.to_string());
            }

            let dependency_fingerprints: Vec<String> = graph
                .dependencies_of(id)
                .iter()
                .filter_map(|dep| fingerprints.get(dep).cloned())
                .collect();
            let validity = oracle.check(ws, id, &dependency_fingerprints)?;
            fingerprints.insert(id, validity.fingerprint.clone());

            let upstream_changed = graph
                .transitive_closure(&[id])
                .iter()
                .any(|dep| *dep != id && changed.contains(dep));

            let results_dir = self.results_dir(id, &validity.fingerprint);
            let valid = validity.valid
                && !upstream_changed
                && (self.mode == ResolveMode::Local || results_dir.is_dir());

            let state = if valid {
                tracing::debug!("`{}` is up to date", address);
                TargetState::Valid
            } else {
                self.set_state(&mut report, id, TargetState::Invalid);
                let state = self.resolve_one(id, &results_dir, &validity.fingerprint, node_paths)
                    .inspect_err(|_| self.set_state(&mut report, id, TargetState::Failed))?;
                oracle.update(address, &validity.fingerprint)?;
                changed.insert(id);
                state
            };

            node_paths.resolved(id, results_dir);
            self.set_state(&mut report, id, state);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            Ok::<(), anyhow::Error>(())
        });

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        result?;

        report.elapsed = start.elapsed();
        tracing::debug!("{}", report.summary());
        Ok(report)
    }

    fn set_state(&self, report: &mut ResolveReport, id: TargetId, state: TargetState) {
        tracing::trace!("`{}` -> {:?}", self.ctx.graph().address_of(id), state);
        report.states.insert(id, state);
    }

    fn results_dir(&self, id: TargetId, fingerprint: &str) -> PathBuf {
        let ws = self.ctx.workspace;
        match self.mode {
            ResolveMode::Isolated => ws
                .resolve_dir()
                .join(ws.graph().address_of(id).id())
                .join(fingerprint),
            ResolveMode::Local => ws.target_dir(id),
        }
    }

    /// Produce the results of one invalid target, from cache or resolver.
    fn resolve_one(
        &self,
        id: TargetId,
        results_dir: &std::path::Path,
        fingerprint: &str,
        node_paths: &NodePaths,
    ) -> Result<TargetState> {
        let graph = self.ctx.graph();
        let target = graph.target(id);
        let address = &target.address;

        if let Some(cache) = &self.cache {
            if cache.fetch(address, fingerprint, results_dir)? {
                tracing::info!("restored `{}` from the artifact cache", address);
                return Ok(TargetState::Restored);
            }
        }

        let resolver = self
            .registry
            .resolver_for(target.kind())
            .ok_or_else(|| anyhow::anyhow!("no resolver registered for `{}`", address))?;

        match self.mode {
            ResolveMode::Isolated => recreate_dir(results_dir)?,
            ResolveMode::Local => ensure_dir(results_dir)?,
        }

        tracing::info!("resolving `{}` with {}", address, resolver.name());
        tracing::trace!("`{}` -> {:?}", address, TargetState::Resolving);
        resolver
            .resolve_target(&self.ctx, id, results_dir, node_paths, &self.options)
            .map_err(|source| ResolveError::ResolutionFailed {
                target: address.clone(),
                source: source.into(),
            })?;

        if let Some(cache) = &self.cache {
            cache.store(address, fingerprint, results_dir)?;
        }
        Ok(TargetState::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;

    use crate::core::target::TargetKind;
    use crate::core::workspace::Workspace;
    use crate::resolver::invalidation::FingerprintStore;
    use crate::resolver::resolvers::NodeResolver;
    use crate::test_support::fixtures::{create_file, GraphFixture};
    use crate::test_support::MockRunner;
    use crate::util::config::Config;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Records the order of resolve calls and writes a marker file.
    #[derive(Clone, Default)]
    struct RecordingResolver {
        calls: Rc<RefCell<Vec<String>>>,
        prepared: Rc<RefCell<usize>>,
        fail_on: Option<&'static str>,
    }

    impl NodeResolver for RecordingResolver {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn prepare(&self, _ctx: &ResolveContext<'_>) -> Result<()> {
            *self.prepared.borrow_mut() += 1;
            Ok(())
        }

        fn resolve_target(
            &self,
            ctx: &ResolveContext<'_>,
            target: TargetId,
            results_dir: &Path,
            node_paths: &NodePaths,
            _options: &ResolveOptions,
        ) -> Result<()> {
            let graph = ctx.graph();
            let name = graph.address_of(target).name().to_string();
            if self.fail_on == Some(name.as_str()) {
                anyhow::bail!("boom");
            }
            for dep in graph.dependencies_of(target) {
                if graph.target(*dep).kind() == TargetKind::NodeModule {
                    assert!(node_paths.node_path(*dep).is_some());
                }
            }
            create_file(results_dir, "resolved.txt", &name);
            self.calls.borrow_mut().push(name);
            Ok(())
        }
    }

    fn chain_workspace(root: &Path, config: Config) -> Workspace {
        create_file(root, "a/index.js", "a");
        let mut fx = GraphFixture::new();
        fx.node_module("c", &[]);
        fx.node_module("b", &["c"]);
        fx.node_module("a", &["b"]).with_sources(&["index.js"]);
        fx.library("lib", &[]);
        fx.workspace_with_config(root, config)
    }

    fn registry(resolver: &RecordingResolver) -> ResolverRegistry {
        let mut registry = ResolverRegistry::new();
        registry.register(TargetKind::NodeModule, Box::new(resolver.clone()));
        registry
    }

    fn run(
        ws: &Workspace,
        registry: &ResolverRegistry,
        mode: ResolveMode,
        roots: &[&str],
    ) -> Result<(ResolveReport, NodePaths)> {
        let runner = MockRunner::new();
        let ctx = ResolveContext::new(ws, &runner);
        let roots: Vec<TargetId> = roots
            .iter()
            .map(|spec| ws.graph().lookup_spec(spec).unwrap())
            .collect();
        let mut store = FingerprintStore::open(ws, "resolve").unwrap();
        let mut node_paths = NodePaths::new();
        let report = ResolveExecutor::new(ctx, registry, mode)
            .verbose(true)
            .execute(&roots, &mut store, &mut node_paths)?;
        Ok((report, node_paths))
    }

    #[test]
    fn test_dependencies_resolve_first() {
        let tmp = TempDir::new().unwrap();
        let ws = chain_workspace(tmp.path(), Config::default());
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        let (report, node_paths) = run(&ws, &registry, ResolveMode::Isolated, &["a"]).unwrap();
        assert_eq!(*resolver.calls.borrow(), vec!["c", "b", "a"]);
        assert_eq!(*resolver.prepared.borrow(), 1);
        assert_eq!(report.with_state(TargetState::Resolved).len(), 3);
        assert!(report.summary().starts_with("Finished 3 target(s) in "));
        assert!(report.summary().ends_with("(0 up to date)"));

        let a = ws.graph().lookup_spec("a").unwrap();
        let a_dir = node_paths.node_path(a).unwrap();
        assert!(a_dir.starts_with(ws.resolve_dir().join("a.a")));
        assert!(a_dir.join("resolved.txt").is_file());
    }

    #[test]
    fn test_second_isolated_run_skips_valid_targets() {
        let tmp = TempDir::new().unwrap();
        let ws = chain_workspace(tmp.path(), Config::default());
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        run(&ws, &registry, ResolveMode::Isolated, &["a"]).unwrap();
        resolver.calls.borrow_mut().clear();

        let (report, node_paths) = run(&ws, &registry, ResolveMode::Isolated, &["a"]).unwrap();
        assert!(resolver.calls.borrow().is_empty());
        assert_eq!(report.with_state(TargetState::Valid).len(), 3);
        assert!(report.summary().starts_with("Finished 0 target(s) in "));
        assert!(report.summary().ends_with("(3 up to date)"));
        assert_eq!(node_paths.len(), 3);
    }

    #[test]
    fn test_dependents_of_changed_targets_resolve_again() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "c/package.json", "{}");
        let mut fx = GraphFixture::new();
        fx.node_module("c", &[]).with_sources(&["package.json"]);
        fx.node_module("b", &["c"]);
        fx.node_module("x", &[]);
        let ws = fx.workspace(tmp.path());
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        run(&ws, &registry, ResolveMode::Isolated, &["b", "x"]).unwrap();
        resolver.calls.borrow_mut().clear();

        create_file(tmp.path(), "c/package.json", "{\"version\": \"2.0.0\"}");
        run(&ws, &registry, ResolveMode::Isolated, &["b", "x"]).unwrap();
        assert_eq!(*resolver.calls.borrow(), vec!["c", "b"]);
    }

    #[test]
    fn test_local_mode_always_resolves_into_source_dirs() {
        let tmp = TempDir::new().unwrap();
        let ws = chain_workspace(tmp.path(), Config::default());
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        run(&ws, &registry, ResolveMode::Local, &["a"]).unwrap();
        let (_, node_paths) = run(&ws, &registry, ResolveMode::Local, &["a"]).unwrap();
        assert_eq!(resolver.calls.borrow().len(), 6);

        let b = ws.graph().lookup_spec("b").unwrap();
        assert_eq!(node_paths.node_path(b), Some(tmp.path().join("b").as_path()));
        assert!(tmp.path().join("b/resolved.txt").is_file());
    }

    #[test]
    fn test_nothing_resolvable_skips_prepare() {
        let tmp = TempDir::new().unwrap();
        let ws = chain_workspace(tmp.path(), Config::default());
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        let (report, node_paths) = run(&ws, &registry, ResolveMode::Isolated, &["lib"]).unwrap();
        assert!(report.states.is_empty());
        assert!(node_paths.is_empty());
        assert_eq!(*resolver.prepared.borrow(), 0);
    }

    #[test]
    fn test_failure_names_target_and_keeps_finished_work() {
        let tmp = TempDir::new().unwrap();
        let ws = chain_workspace(tmp.path(), Config::default());
        let resolver = RecordingResolver {
            fail_on: Some("b"),
            ..RecordingResolver::default()
        };
        let registry = registry(&resolver);

        let runner = MockRunner::new();
        let ctx = ResolveContext::new(&ws, &runner);
        let a = ws.graph().lookup_spec("a").unwrap();
        let c = ws.graph().lookup_spec("c").unwrap();
        let mut store = FingerprintStore::open(&ws, "resolve").unwrap();
        let mut node_paths = NodePaths::new();

        let err = ResolveExecutor::new(ctx, &registry, ResolveMode::Isolated)
            .verbose(true)
            .execute(&[a], &mut store, &mut node_paths)
            .unwrap_err();
        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::ResolutionFailed { target, .. }) => {
                assert_eq!(target.to_string(), "b:b")
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(node_paths.len(), 1);
        assert!(node_paths.node_path(c).is_some());
        assert!(store.get(ws.graph().address_of(c)).is_some());
    }

    #[test]
    fn test_artifact_cache_restores_results() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.enabled = Some(true);
        config.cache.dir = Some(tmp.path().join("cache"));
        let ws = chain_workspace(tmp.path(), config);
        let resolver = RecordingResolver::default();
        let registry = registry(&resolver);

        run(&ws, &registry, ResolveMode::Isolated, &["c"]).unwrap();
        std::fs::remove_dir_all(ws.work_dir()).unwrap();
        resolver.calls.borrow_mut().clear();

        let (report, node_paths) = run(&ws, &registry, ResolveMode::Isolated, &["c"]).unwrap();
        assert!(resolver.calls.borrow().is_empty());
        assert_eq!(report.with_state(TargetState::Restored).len(), 1);
        let c = ws.graph().lookup_spec("c").unwrap();
        assert!(node_paths.node_path(c).unwrap().join("resolved.txt").is_file());
    }
}
