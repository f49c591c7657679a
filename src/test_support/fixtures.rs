//! Graph fixtures for unit tests.
//!
//! Dependency specs are resolved relative to the declaring target's
//! directory, the same way build files resolve them.

use std::path::Path;

use crate::core::address::Address;
use crate::core::graph::{TargetGraph, TargetGraphBuilder};
use crate::core::target::{NodeModuleAttrs, Payload, Provides, Target};
use crate::core::workspace::Workspace;
use crate::util::config::Config;

/// Incrementally declared targets, frozen with [`GraphFixture::build`].
#[derive(Debug, Default)]
pub struct GraphFixture {
    targets: Vec<Target>,
}

/// Handle to the most recently declared fixture target.
pub struct FixtureTarget<'a> {
    target: &'a mut Target,
}

impl FixtureTarget<'_> {
    /// Fold a binary into this (published) target's distribution.
    pub fn with_binary(self, name: &str, spec: &str) -> Self {
        let binary = Address::parse_relative(spec, self.target.address.spec_path()).unwrap();
        let provides = self
            .target
            .provides
            .take()
            .expect("with_binary on an unpublished fixture target");
        self.target.provides = Some(provides.with_binary(name, binary));
        self
    }

    pub fn with_sources(self, sources: &[&str]) -> Self {
        self.target.sources = sources.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl GraphFixture {
    pub fn new() -> Self {
        GraphFixture::default()
    }

    /// Add a fully built target.
    pub fn add(&mut self, target: Target) -> FixtureTarget<'_> {
        self.targets.push(target);
        let target = self.targets.last_mut().unwrap();
        FixtureTarget { target }
    }

    fn declare(&mut self, spec: &str, payload: Payload, deps: &[&str]) -> FixtureTarget<'_> {
        let address = Address::parse(spec).unwrap();
        let deps: Vec<Address> = deps
            .iter()
            .map(|d| Address::parse_relative(d, address.spec_path()).unwrap())
            .collect();
        self.add(Target::new(address, payload).with_dependencies(deps))
    }

    pub fn library(&mut self, spec: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(spec, Payload::Library, deps)
    }

    pub fn binary(&mut self, spec: &str, entry_point: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(
            spec,
            Payload::Binary {
                entry_point: Some(entry_point.to_string()),
            },
            deps,
        )
    }

    /// A library published as `dist_name==0.0.0`.
    pub fn published(&mut self, spec: &str, dist_name: &str, deps: &[&str]) -> FixtureTarget<'_> {
        let handle = self.declare(spec, Payload::Library, deps);
        handle.target.provides = Some(Provides::new(dist_name, semver::Version::new(0, 0, 0)));
        handle
    }

    pub fn requirement(&mut self, spec: &str, requirements: &[&str]) -> FixtureTarget<'_> {
        self.declare(
            spec,
            Payload::Requirement {
                requirements: requirements.iter().map(|r| r.to_string()).collect(),
            },
            &[],
        )
    }

    pub fn resources(&mut self, spec: &str) -> FixtureTarget<'_> {
        self.declare(spec, Payload::Resources, &[])
    }

    pub fn alias(&mut self, spec: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(spec, Payload::Alias, deps)
    }

    pub fn node_module(&mut self, spec: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(spec, Payload::NodeModule(NodeModuleAttrs::default()), deps)
    }

    pub fn preinstalled_module(&mut self, spec: &str, url: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(
            spec,
            Payload::NodePreinstalledModule {
                module: NodeModuleAttrs::default(),
                dependencies_archive_url: url.to_string(),
            },
            deps,
        )
    }

    pub fn remote_module(&mut self, spec: &str, version: &str) -> FixtureTarget<'_> {
        self.declare(
            spec,
            Payload::NodeRemoteModule {
                package_name: None,
                version: version.to_string(),
            },
            &[],
        )
    }

    pub fn karma_tests(&mut self, spec: &str, config: &str, deps: &[&str]) -> FixtureTarget<'_> {
        self.declare(spec, Payload::karma_tests(None, Some(config)), deps)
    }

    pub fn build(self) -> TargetGraph {
        let mut builder = TargetGraphBuilder::new();
        for target in self.targets {
            builder.add(target);
        }
        builder.build().unwrap()
    }

    /// Build a workspace rooted at `root` with default configuration.
    pub fn workspace(self, root: &Path) -> Workspace {
        self.workspace_with_config(root, Config::default())
    }

    pub fn workspace_with_config(self, root: &Path, config: Config) -> Workspace {
        Workspace::from_parts(root.to_path_buf(), config, self.build())
    }
}

/// Write `contents` to `root/relpath`, creating parents.
pub fn create_file(root: &Path, relpath: &str, contents: &str) {
    let path = root.join(relpath);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
