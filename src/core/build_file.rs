//! BUILD.toml loading.
//!
//! Every directory under the build root may declare targets:
//!
//! ```toml
//! [[target]]
//! name = "foo"
//! kind = "library"
//! sources = ["*.py"]
//! dependencies = [":bar", "3rdparty/python:req1"]
//! provides = { name = "foo", version = "0.0.0", binaries = { foo = ":foo_bin" } }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::core::address::Address;
use crate::core::graph::{GraphError, TargetGraph, TargetGraphBuilder};
use crate::core::target::{NodeModuleAttrs, Payload, PackageManager, Provides, Target, TargetKind};

/// Name of the per-directory build file.
pub const BUILD_FILE_NAME: &str = "BUILD.toml";

/// Directory names never searched for build files.
const SKIPPED_DIRS: &[&str] = &["dist", "node_modules"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildFile {
    #[serde(default)]
    target: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    name: String,
    kind: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    provides: Option<RawProvides>,

    // binary
    entry_point: Option<String>,
    // requirement
    #[serde(default)]
    requirements: Vec<String>,
    // node modules
    package_name: Option<String>,
    package_manager: Option<String>,
    dependencies_archive_url: Option<String>,
    version: Option<String>,
    // karma
    karma_bin: Option<String>,
    config: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProvides {
    name: String,
    version: String,
    #[serde(default)]
    binaries: IndexMap<String, String>,
}

/// Parse the contents of one build file declared in `spec_path`.
pub fn parse_build_file(
    contents: &str,
    spec_path: &str,
    display_path: &str,
) -> Result<Vec<Target>, GraphError> {
    let raw: RawBuildFile = toml::from_str(contents).map_err(|e| GraphError::BuildFile {
        path: display_path.to_string(),
        message: e.to_string(),
    })?;

    raw.target
        .into_iter()
        .map(|t| convert_target(t, spec_path, display_path))
        .collect()
}

fn convert_target(raw: RawTarget, spec_path: &str, display_path: &str) -> Result<Target, GraphError> {
    let err = |message: String| GraphError::BuildFile {
        path: display_path.to_string(),
        message,
    };

    let address = Address::parse_relative(&format!(":{}", raw.name), spec_path)?;
    let kind: TargetKind = raw
        .kind
        .parse()
        .map_err(|e: String| err(format!("target `{}`: {}", raw.name, e)))?;

    let package_manager = raw
        .package_manager
        .as_deref()
        .map(str::parse::<PackageManager>)
        .transpose()
        .map_err(|e| err(format!("target `{}`: {}", raw.name, e)))?;

    let module = NodeModuleAttrs {
        package_name: raw.package_name.clone(),
        package_manager,
    };

    let payload = match kind {
        TargetKind::Library => Payload::Library,
        TargetKind::Binary => Payload::Binary {
            entry_point: raw.entry_point,
        },
        TargetKind::Requirement => Payload::Requirement {
            requirements: raw.requirements,
        },
        TargetKind::Resources => Payload::Resources,
        TargetKind::Alias => Payload::Alias,
        TargetKind::NodeModule => Payload::NodeModule(module),
        TargetKind::NodePreinstalledModule => Payload::NodePreinstalledModule {
            module,
            dependencies_archive_url: raw.dependencies_archive_url.ok_or_else(|| {
                err(format!(
                    "target `{}` requires `dependencies_archive_url`",
                    raw.name
                ))
            })?,
        },
        TargetKind::NodeRemoteModule => Payload::NodeRemoteModule {
            package_name: raw.package_name,
            version: raw
                .version
                .ok_or_else(|| err(format!("target `{}` requires `version`", raw.name)))?,
        },
        TargetKind::NodeKarmaTests => {
            Payload::karma_tests(raw.karma_bin.as_deref(), raw.config.as_deref())
        }
    };

    let dependencies = raw
        .dependencies
        .iter()
        .map(|spec| Address::parse_relative(spec, spec_path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut target = Target::new(address, payload)
        .with_dependencies(dependencies)
        .with_sources(raw.sources);

    if let Some(provides) = raw.provides {
        let version = semver::Version::parse(&provides.version).map_err(|e| {
            err(format!(
                "target `{}` has invalid version `{}`: {}",
                raw.name, provides.version, e
            ))
        })?;
        let mut resolved = Provides::new(provides.name, version);
        for (name, spec) in provides.binaries {
            resolved = resolved.with_binary(name, Address::parse_relative(&spec, spec_path)?);
        }
        target = target.with_provides(resolved);
    }

    Ok(target)
}

/// Find every build file under `root`, in sorted path order.
pub fn discover_build_files(root: &Path, work_dir_name: &str) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !(name.starts_with('.') || name == work_dir_name || SKIPPED_DIRS.contains(&name.as_ref()))
        });

    walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == BUILD_FILE_NAME)
        .map(|entry| entry.into_path())
        .collect()
}

/// Load every build file under `root` into a target graph.
pub fn load_target_graph(root: &Path, work_dir_name: &str) -> Result<TargetGraph, GraphError> {
    let mut builder = TargetGraphBuilder::new();

    for path in discover_build_files(root, work_dir_name) {
        let dir = path.parent().unwrap_or(root);
        let spec_path = crate::util::fs::relative_path(root, dir)
            .to_string_lossy()
            .replace('\\', "/");
        let path_display = path.display().to_string();

        let contents = std::fs::read_to_string(&path).map_err(|e| GraphError::BuildFile {
            path: path_display.clone(),
            message: e.to_string(),
        })?;

        let targets = parse_build_file(&contents, &spec_path, &path_display)?;
        tracing::debug!("loaded {} target(s) from {}", targets.len(), path_display);
        for target in targets {
            builder.add(target);
        }
    }

    builder.build()
}
