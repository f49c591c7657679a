//! Configuration file support for Quay.
//!
//! Quay reads configuration from two locations:
//! - Global: `~/.quay/config.toml` - User-wide defaults
//! - Project: `quay.toml` at the build root - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::target::PackageManager;

/// Name of the project configuration file that also marks the build root.
pub const PROJECT_CONFIG_NAME: &str = "quay.toml";

/// Source roots used when none are configured.
pub const DEFAULT_SOURCE_ROOTS: &[&str] = &["src/python", "src"];

/// Default timeout for fetching preinstalled module archives.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// Quay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node resolve settings
    pub node: NodeConfig,

    /// Python packaging settings
    #[serde(rename = "setup-py")]
    pub setup_py: SetupPyConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,
}

/// Node-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NodeConfig {
    /// Default package manager (npm, yarn)
    pub package_manager: Option<String>,

    /// Path or name of the node executable
    pub node: Option<String>,

    /// Install optional dependencies during isolated resolves
    pub install_optional: Option<bool>,

    /// Pass --force to the package manager
    pub force: Option<bool>,

    /// Require an up-to-date lockfile (yarn only)
    pub frozen_lockfile: Option<bool>,

    /// Timeout for archive downloads, in seconds
    pub fetch_timeout_secs: Option<u64>,
}

/// Packaging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SetupPyConfig {
    /// Directory prefixes stripped from source paths in distributions
    pub source_roots: Option<Vec<String>>,
}

/// Artifact cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable reading and writing the artifact cache
    pub enabled: Option<bool>,

    /// Cache directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Node settings
        if other.node.package_manager.is_some() {
            self.node.package_manager = other.node.package_manager;
        }
        if other.node.node.is_some() {
            self.node.node = other.node.node;
        }
        if other.node.install_optional.is_some() {
            self.node.install_optional = other.node.install_optional;
        }
        if other.node.force.is_some() {
            self.node.force = other.node.force;
        }
        if other.node.frozen_lockfile.is_some() {
            self.node.frozen_lockfile = other.node.frozen_lockfile;
        }
        if other.node.fetch_timeout_secs.is_some() {
            self.node.fetch_timeout_secs = other.node.fetch_timeout_secs;
        }

        // Packaging settings
        if other.setup_py.source_roots.is_some() {
            self.setup_py.source_roots = other.setup_py.source_roots;
        }

        // Cache settings
        if other.cache.enabled.is_some() {
            self.cache.enabled = other.cache.enabled;
        }
        if other.cache.dir.is_some() {
            self.cache.dir = other.cache.dir;
        }
    }

    /// The configured package manager, defaulting to npm.
    pub fn package_manager(&self) -> Result<PackageManager> {
        match self.node.package_manager.as_deref() {
            Some(s) => s.parse().map_err(anyhow::Error::msg),
            None => Ok(PackageManager::default()),
        }
    }

    /// The node executable to run karma with.
    pub fn node_executable(&self) -> &str {
        self.node.node.as_deref().unwrap_or("node")
    }

    /// Source roots, longest first.
    pub fn source_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = match &self.setup_py.source_roots {
            Some(roots) => roots
                .iter()
                .map(|r| r.trim_matches('/').to_string())
                .collect(),
            None => DEFAULT_SOURCE_ROOTS.iter().map(|r| r.to_string()).collect(),
        };
        roots.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        roots.dedup();
        roots
    }

    /// Timeout for archive downloads.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(
            self.node
                .fetch_timeout_secs
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        )
    }

    /// Whether the artifact cache is used for isolated resolves.
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled.unwrap_or(false)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (quay.toml)
/// 2. Global config (~/.quay/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global quay config directory (~/.quay).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// Get the global config path (~/.quay/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (quay.toml).
pub fn project_config_path(build_root: &Path) -> PathBuf {
    build_root.join(PROJECT_CONFIG_NAME)
}
