//! Target definitions - the nodes of the build graph.
//!
//! A Target is identified by its [`Address`] and carries a kind-specific
//! payload. The payload variant determines the exact [`TargetKind`], which is
//! what resolvers are registered against.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// Default location of the karma CLI inside a resolved node module.
pub const DEFAULT_KARMA_BIN: &str = "./node_modules/karma/bin";

/// The exact subtype of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Library sources packaged by a published target
    Library,
    /// Executable entry point, folded into its owner at package time
    Binary,
    /// Third-party requirement strings
    Requirement,
    /// Non-code files packaged alongside libraries
    Resources,
    /// Aggregate of other targets with no sources of its own
    Alias,
    /// Node package with a package.json, installed by a package manager
    NodeModule,
    /// Node module whose node_modules come from a prebuilt archive
    NodePreinstalledModule,
    /// Node package fetched by version from a registry
    NodeRemoteModule,
    /// Karma test suite run against its first dependency
    NodeKarmaTests,
}

impl TargetKind {
    /// All kinds, in declaration order.
    pub const ALL: [TargetKind; 9] = [
        TargetKind::Library,
        TargetKind::Binary,
        TargetKind::Requirement,
        TargetKind::Resources,
        TargetKind::Alias,
        TargetKind::NodeModule,
        TargetKind::NodePreinstalledModule,
        TargetKind::NodeRemoteModule,
        TargetKind::NodeKarmaTests,
    ];

    /// The name used in build files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Library => "library",
            TargetKind::Binary => "binary",
            TargetKind::Requirement => "requirement",
            TargetKind::Resources => "resources",
            TargetKind::Alias => "alias",
            TargetKind::NodeModule => "node_module",
            TargetKind::NodePreinstalledModule => "node_preinstalled_module",
            TargetKind::NodeRemoteModule => "node_remote_module",
            TargetKind::NodeKarmaTests => "node_karma_tests",
        }
    }

    /// The kind this one refines, if any.
    ///
    /// Informational only: resolver lookup never consults it.
    pub fn supertype(&self) -> Option<TargetKind> {
        match self {
            TargetKind::NodePreinstalledModule => Some(TargetKind::NodeModule),
            _ => None,
        }
    }

    /// Whether sources of this kind must be packaged by some published target.
    pub fn requires_export(&self) -> bool {
        matches!(
            self,
            TargetKind::Library | TargetKind::Binary | TargetKind::Resources
        )
    }

    /// Whether this kind is a node package (has a package name).
    pub fn is_node_package(&self) -> bool {
        matches!(
            self,
            TargetKind::NodeModule
                | TargetKind::NodePreinstalledModule
                | TargetKind::NodeRemoteModule
        )
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = TargetKind::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "unknown target kind '{}'; expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

/// The package manager used to install a node module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    #[serde(alias = "yarnpkg")]
    Yarn,
}

impl PackageManager {
    /// Name of the executable to look up on PATH.
    pub fn executable(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarnpkg",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManager::Npm => f.write_str("npm"),
            PackageManager::Yarn => f.write_str("yarn"),
        }
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" => Ok(PackageManager::Npm),
            "yarn" | "yarnpkg" => Ok(PackageManager::Yarn),
            _ => Err(format!(
                "invalid package manager '{}'; expected 'npm' or 'yarn'",
                s
            )),
        }
    }
}

/// Publishable identity of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provides {
    /// Distribution name
    pub name: String,

    /// Distribution version
    pub version: Version,

    /// Console script name -> binary target
    pub binaries: IndexMap<String, Address>,
}

impl Provides {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Provides {
            name: name.into(),
            version,
            binaries: IndexMap::new(),
        }
    }

    /// Fold a binary target into this distribution under `name`.
    pub fn with_binary(mut self, name: impl Into<String>, binary: Address) -> Self {
        self.binaries.insert(name.into(), binary);
        self
    }

    /// The requirement string dependents declare, e.g. `foo==0.0.0`.
    pub fn key(&self) -> String {
        format!("{}=={}", self.name, self.version)
    }

    /// The `name-version` stem used for distribution directories.
    pub fn stem(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Attributes shared by installable node modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeModuleAttrs {
    /// package.json name (defaults to the target name)
    pub package_name: Option<String>,

    /// Package manager override for this module
    pub package_manager: Option<PackageManager>,
}

/// Kind-specific target data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Library,
    Binary {
        entry_point: Option<String>,
    },
    Requirement {
        requirements: Vec<String>,
    },
    Resources,
    Alias,
    NodeModule(NodeModuleAttrs),
    NodePreinstalledModule {
        module: NodeModuleAttrs,
        dependencies_archive_url: String,
    },
    NodeRemoteModule {
        package_name: Option<String>,
        version: String,
    },
    NodeKarmaTests {
        karma_bin: String,
        config: String,
    },
}

impl Payload {
    /// The exact kind this payload describes.
    pub fn kind(&self) -> TargetKind {
        match self {
            Payload::Library => TargetKind::Library,
            Payload::Binary { .. } => TargetKind::Binary,
            Payload::Requirement { .. } => TargetKind::Requirement,
            Payload::Resources => TargetKind::Resources,
            Payload::Alias => TargetKind::Alias,
            Payload::NodeModule(_) => TargetKind::NodeModule,
            Payload::NodePreinstalledModule { .. } => TargetKind::NodePreinstalledModule,
            Payload::NodeRemoteModule { .. } => TargetKind::NodeRemoteModule,
            Payload::NodeKarmaTests { .. } => TargetKind::NodeKarmaTests,
        }
    }

    /// Karma test payload with the bin location normalized.
    pub fn karma_tests(karma_bin: Option<&str>, config: Option<&str>) -> Self {
        Payload::NodeKarmaTests {
            karma_bin: normalize_karma_bin(karma_bin),
            config: config.unwrap_or_default().to_string(),
        }
    }
}

/// A node in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Unique address
    pub address: Address,

    /// Kind-specific data
    pub payload: Payload,

    /// Declared dependencies, in declaration order, without duplicates
    pub dependencies: Vec<Address>,

    /// Source globs relative to the target's directory
    pub sources: Vec<String>,

    /// Publishable identity, if this target is a packaging unit
    pub provides: Option<Provides>,
}

impl Target {
    pub fn new(address: Address, payload: Payload) -> Self {
        Target {
            address,
            payload,
            dependencies: Vec::new(),
            sources: Vec::new(),
            provides: None,
        }
    }

    /// Set the dependencies, dropping repeats but keeping first occurrence order.
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Address>) -> Self {
        self.dependencies.clear();
        for dep in dependencies {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_provides(mut self, provides: Provides) -> Self {
        self.provides = Some(provides);
        self
    }

    pub fn kind(&self) -> TargetKind {
        self.payload.kind()
    }

    /// Whether this target is an independently packageable unit.
    pub fn is_published(&self) -> bool {
        self.provides.is_some()
    }

    /// The package.json name of a node package.
    pub fn package_name(&self) -> Option<&str> {
        let explicit = match &self.payload {
            Payload::NodeModule(attrs) => attrs.package_name.as_deref(),
            Payload::NodePreinstalledModule { module, .. } => module.package_name.as_deref(),
            Payload::NodeRemoteModule { package_name, .. } => package_name.as_deref(),
            _ => return None,
        };
        Some(explicit.unwrap_or_else(|| self.address.name()))
    }

    /// Package manager override of a node module.
    pub fn package_manager(&self) -> Option<PackageManager> {
        match &self.payload {
            Payload::NodeModule(attrs) => attrs.package_manager,
            Payload::NodePreinstalledModule { module, .. } => module.package_manager,
            _ => None,
        }
    }

    /// Entry point of a binary target.
    pub fn entry_point(&self) -> Option<&str> {
        match &self.payload {
            Payload::Binary { entry_point } => entry_point.as_deref(),
            _ => None,
        }
    }

    /// Requirement strings of a requirement target.
    pub fn requirements(&self) -> &[String] {
        match &self.payload {
            Payload::Requirement { requirements } => requirements,
            _ => &[],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.address)
    }
}

/// Normalize a karma bin directory to the path of the `karma` executable.
///
/// Empty path segments are dropped, so `./node_modules//karma/bin/` becomes
/// `./node_modules/karma/bin/karma`.
pub fn normalize_karma_bin(karma_bin: Option<&str>) -> String {
    let raw = karma_bin.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_KARMA_BIN);
    let joined = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/karma", joined)
}
