//! Per-target invalidation.
//!
//! A target's fingerprint covers its definition, the contents of its
//! sources and the fingerprints of its resolvable dependencies. A target is
//! valid when the stored fingerprint for its address matches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::graph::TargetId;
use crate::core::workspace::Workspace;
use crate::core::Address;
use crate::util::fs::{relative_path, slash_path, write_string};
use crate::util::hash::Fingerprint;

/// Result of checking one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    pub fingerprint: String,
    pub valid: bool,
}

/// Decides which targets need resolving and remembers which succeeded.
pub trait InvalidationOracle {
    /// Fingerprint `id` and compare it with the stored one.
    fn check(&self, ws: &Workspace, id: TargetId, dependency_fingerprints: &[String]) -> Result<Validity>;

    /// Record that `target` was resolved at `fingerprint`.
    fn update(&mut self, target: &Address, fingerprint: &str) -> Result<()>;

    /// Forget every stored fingerprint.
    fn invalidate_all(&mut self) -> Result<()>;
}

/// Fingerprint of a target's definition, sources and dependencies.
pub fn target_fingerprint(ws: &Workspace, id: TargetId, dependency_fingerprints: &[String]) -> Result<String> {
    let target = ws.target(id);
    let definition =
        serde_json::to_string(target).context("failed to serialize target definition")?;

    let mut fp = Fingerprint::new();
    fp.update_str(&definition);
    let target_dir = ws.target_dir(id);
    for source in ws.target_sources(id)? {
        fp.update_file(&slash_path(&relative_path(&target_dir, &source)), &source)?;
    }
    fp.update_strs(dependency_fingerprints.iter().map(String::as_str));
    Ok(fp.finish_short())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredFingerprints {
    targets: BTreeMap<String, String>,
}

/// JSON-backed store at `<workdir>/build_invalidator/<scope>.json`.
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    stored: StoredFingerprints,
}

impl FingerprintStore {
    /// Open the store for `scope`, starting empty if it does not exist yet.
    pub fn open(ws: &Workspace, scope: &str) -> Result<Self> {
        Self::load(ws.invalidator_dir().join(format!("{}.json", scope)))
    }

    /// Load a store from an explicit path.
    pub fn load(path: PathBuf) -> Result<Self> {
        let stored = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!("ignoring corrupt fingerprint store {}: {}", path.display(), e);
                    StoredFingerprints::default()
                }
            }
        } else {
            StoredFingerprints::default()
        };
        Ok(FingerprintStore { path, stored })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored fingerprint of `target`, if any.
    pub fn get(&self, target: &Address) -> Option<&str> {
        self.stored.targets.get(&target.id()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stored.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.targets.is_empty()
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.stored)
            .context("failed to serialize fingerprints")?;
        write_string(&self.path, &json)
    }
}

impl InvalidationOracle for FingerprintStore {
    fn check(&self, ws: &Workspace, id: TargetId, dependency_fingerprints: &[String]) -> Result<Validity> {
        let fingerprint = target_fingerprint(ws, id, dependency_fingerprints)?;
        let valid = self.get(ws.graph().address_of(id)) == Some(fingerprint.as_str());
        Ok(Validity { fingerprint, valid })
    }

    fn update(&mut self, target: &Address, fingerprint: &str) -> Result<()> {
        self.stored
            .targets
            .insert(target.id(), fingerprint.to_string());
        self.save()
    }

    fn invalidate_all(&mut self) -> Result<()> {
        self.stored.targets.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}
