//! setup.py generation for published targets.
//!
//! A distribution chroot holds the sources of a published target and of the
//! unpublished targets it owns under `src/`, laid out relative to their
//! source roots, plus a generated `setup.py`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::core::graph::TargetId;
use crate::core::target::TargetKind;
use crate::core::workspace::Workspace;
use crate::export::errors::ExportError;
use crate::export::reduced::{install_requires, DependencyCalculator};
use crate::util::fs::{copy_file, recreate_dir, relative_path, slash_path, write_string};

/// Directory inside the chroot holding package sources.
pub const SOURCE_ROOT: &str = "src";

static NAMESPACE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdeclare_namespace\s*\(\s*__name__\s*\)").expect("static regex")
});

/// Whether python source text declares a pkg_resources namespace package.
pub fn declares_namespace_package(source: &str) -> bool {
    NAMESPACE_DECL.is_match(source)
}

/// The package in `all_packages` sharing the longest dotted prefix with
/// `package`, or `package` itself when none shares anything.
pub fn nearest_subpackage<'a, I>(package: &str, all_packages: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let parts: Vec<&str> = package.split('.').collect();
    let best = all_packages
        .into_iter()
        .map(|candidate| {
            parts
                .iter()
                .zip(candidate.split('.'))
                .take_while(|(a, b)| **a == *b)
                .count()
        })
        .max()
        .unwrap_or(0);

    if best == 0 {
        package.to_string()
    } else {
        parts[..best].join(".")
    }
}

/// Packages, namespace packages and package data found in a source tree.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FoundPackages {
    pub packages: BTreeSet<String>,
    pub namespace_packages: BTreeSet<String>,
    pub resources: BTreeMap<String, BTreeSet<String>>,
}

/// Scan `base` (the chroot's `src/`) for python packages and their data.
pub fn find_packages(base: &Path) -> Result<FoundPackages> {
    let mut files: Vec<(String, String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let dir = entry.path().parent().unwrap_or(base);
        let module = slash_path(&relative_path(base, dir)).replace('/', ".");
        let filename = entry.file_name().to_string_lossy().into_owned();
        files.push((module, filename, entry.path().to_path_buf()));
    }

    let mut found = FoundPackages::default();

    for (module, filename, path) in &files {
        if filename != "__init__.py" {
            continue;
        }
        found.packages.insert(module.clone());
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if declares_namespace_package(&source) {
            found.namespace_packages.insert(module.clone());
        }
    }

    for (module, filename, path) in &files {
        if filename.ends_with(".py") {
            if found.packages.contains(module) {
                continue;
            }
            tracing::warn!(
                "{} is source but does not belong to a package",
                path.display()
            );
        }

        let submodule = nearest_subpackage(module, &found.packages);
        let resource = if submodule == *module {
            filename.clone()
        } else {
            let relative_module = module
                .strip_prefix(&format!("{}.", submodule))
                .unwrap_or(module);
            format!("{}/{}", relative_module.replace('.', "/"), filename)
        };
        found.resources.entry(submodule).or_default().insert(resource);
    }

    Ok(found)
}

/// Keyword arguments passed to `setup()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupKeywords {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_dir: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_packages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_data: Option<BTreeMap<String, Vec<String>>>,
    pub install_requires: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<BTreeMap<String, Vec<String>>>,
}

impl SetupKeywords {
    /// Render a `setup.py` calling `setup(**keywords)`.
    pub fn render(&self, target: &str) -> Result<String> {
        let keywords =
            serde_json::to_string_pretty(self).context("failed to serialize setup keywords")?;
        Ok(format!(
            "# DO NOT EDIT THIS FILE -- AUTOGENERATED BY QUAY\n\
             # Target: {}\n\
             \n\
             from setuptools import setup\n\
             \n\
             setup(**{})\n",
            target, keywords
        ))
    }
}

/// The longest configured source root containing `spec_path`, or `""`.
pub fn source_root_for<'a>(spec_path: &str, source_roots: &'a [String]) -> &'a str {
    source_roots
        .iter()
        .filter(|root| {
            root.is_empty()
                || spec_path == root.as_str()
                || spec_path.starts_with(&format!("{}/", root))
        })
        .max_by_key(|root| root.len())
        .map(String::as_str)
        .unwrap_or("")
}

/// A populated distribution chroot.
#[derive(Debug)]
pub struct PreparedChroot {
    /// `<dist>/<name>-<version>`
    pub dir: PathBuf,
    /// `<name>-<version>`
    pub stem: String,
    pub keywords: SetupKeywords,
    /// The reduced dependency set the chroot was built from
    pub reduced: indexmap::IndexSet<TargetId>,
}

/// Build the distribution chroot for `published` under the dist dir.
pub fn prepare_chroot(
    ws: &Workspace,
    calc: &DependencyCalculator<'_>,
    published: TargetId,
) -> Result<PreparedChroot> {
    let graph = ws.graph();
    let target = graph.target(published);
    let provides = target.provides.as_ref().ok_or_else(|| ExportError::NotPublished {
        target: target.address.clone(),
    })?;

    let reduced = calc.reduced_dependencies(published)?;
    let stem = provides.stem();
    let dir = ws.dist_dir().join(&stem);
    recreate_dir(&dir)?;

    let source_roots = ws.config().source_roots();
    let src_dir = dir.join(SOURCE_ROOT);

    write_target_sources(ws, published, &src_dir, &source_roots)?;
    for &dep in &reduced {
        let dep_target = graph.target(dep);
        let carried = match dep_target.kind() {
            TargetKind::Library | TargetKind::Binary => !dep_target.is_published(),
            TargetKind::Resources => true,
            _ => false,
        };
        if carried {
            write_target_sources(ws, dep, &src_dir, &source_roots)?;
        }
    }

    let found = if src_dir.exists() {
        find_packages(&src_dir)?
    } else {
        FoundPackages::default()
    };

    let mut keywords = SetupKeywords {
        name: provides.name.clone(),
        version: provides.version.to_string(),
        install_requires: install_requires(graph, &reduced).into_iter().collect(),
        ..SetupKeywords::default()
    };
    if !found.namespace_packages.is_empty() {
        keywords.namespace_packages = Some(found.namespace_packages.iter().cloned().collect());
    }
    if !found.packages.is_empty() {
        keywords.package_dir = Some(BTreeMap::from([(String::new(), SOURCE_ROOT.to_string())]));
        keywords.packages = Some(found.packages.iter().cloned().collect());
        keywords.package_data = Some(
            found
                .resources
                .iter()
                .map(|(pkg, files)| (pkg.clone(), files.iter().cloned().collect()))
                .collect(),
        );
    }

    let scripts: Vec<String> = calc
        .iter_entry_points(published)?
        .into_iter()
        .map(|(name, entry_point)| format!("{} = {}", name, entry_point))
        .collect();
    if !scripts.is_empty() {
        keywords.entry_points = Some(BTreeMap::from([("console_scripts".to_string(), scripts)]));
    }

    write_string(&dir.join("setup.py"), &keywords.render(&target.address.to_string())?)?;

    tracing::debug!("prepared chroot for `{}` at {}", target.address, dir.display());

    Ok(PreparedChroot {
        dir,
        stem,
        keywords,
        reduced,
    })
}

/// Copy one target's sources into the chroot, relative to its source root.
///
/// Python sources also pull in every `__init__.py` between them and the
/// source root that exists on disk.
fn write_target_sources(
    ws: &Workspace,
    id: TargetId,
    src_dir: &Path,
    source_roots: &[String],
) -> Result<()> {
    let spec_path = ws.graph().address_of(id).spec_path();
    let source_root = ws.root().join(source_root_for(spec_path, source_roots));

    for source in ws.target_sources(id)? {
        let rel = relative_path(&source_root, &source);
        copy_file(&source, &src_dir.join(&rel))?;

        if source.extension().is_some_and(|ext| ext == "py") {
            let mut dir = source.parent();
            while let Some(current) = dir {
                if current == source_root || !current.starts_with(&source_root) {
                    break;
                }
                let init_py = current.join("__init__.py");
                if init_py.is_file() {
                    copy_file(&init_py, &src_dir.join(relative_path(&source_root, &init_py)))?;
                }
                dir = current.parent();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{create_file, GraphFixture};
    use tempfile::TempDir;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn pkgs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_namespace_packages() {
        assert!(!declares_namespace_package(""));
        assert!(!declares_namespace_package(
            "add(1, 2); foo(__name__); self.shoot(__name__)"
        ));
        assert!(!declares_namespace_package("declare_namespace(bonk)"));
        assert!(declares_namespace_package(
            "__import__(\"pkg_resources\").declare_namespace(__name__)"
        ));
        assert!(declares_namespace_package(
            "import pkg_resources; pkg_resources.declare_namespace(__name__)"
        ));
        assert!(declares_namespace_package(
            "from pkg_resources import declare_namespace; declare_namespace(__name__)"
        ));
    }

    #[test]
    fn test_nearest_subpackage() {
        assert_eq!(nearest_subpackage("foo", &pkgs(&[])), "foo");
        assert_eq!(nearest_subpackage("foo", &pkgs(&["foo"])), "foo");
        assert_eq!(nearest_subpackage("foo", &pkgs(&["bar"])), "foo");

        assert_eq!(nearest_subpackage("foo.bar", &pkgs(&["foo"])), "foo");
        assert_eq!(nearest_subpackage("foo.bar", &pkgs(&["foo", "foo.bar"])), "foo.bar");
        assert_eq!(
            nearest_subpackage("foo.bar.topo", &pkgs(&["foo", "foo.bar"])),
            "foo.bar"
        );
        assert_eq!(
            nearest_subpackage("foo.barization", &pkgs(&["foo", "foo.bar"])),
            "foo"
        );
    }

    fn write_tree(base: &Path, packages: &[&str], namespaces: &[&str], resources: &[(&str, &str)]) {
        let dir = |pkg: &str| base.join(pkg.replace('.', "/"));
        for pkg in packages {
            create_file(&dir(pkg), "__init__.py", "");
        }
        for pkg in namespaces {
            create_file(
                &dir(pkg),
                "__init__.py",
                "__import__(\"pkg_resources\").declare_namespace(__name__)",
            );
        }
        for (pkg, file) in resources {
            create_file(&dir(pkg), file, "asdfasdf");
        }
    }

    #[test]
    fn test_find_packages_and_namespaces() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["foo"], &[], &[]);
        let found = find_packages(tmp.path()).unwrap();
        assert_eq!(found.packages, set(&["foo"]));
        assert!(found.namespace_packages.is_empty());
        assert!(found.resources.is_empty());

        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[], &["foo"], &[]);
        let found = find_packages(tmp.path()).unwrap();
        assert_eq!(found.packages, set(&["foo"]));
        assert_eq!(found.namespace_packages, set(&["foo"]));
    }

    #[test]
    fn test_find_packages_resources() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &["foo"],
            &[],
            &[("foo", "f0"), ("foo", "bar/baz/f1"), ("foo", "bar/baz/f2")],
        );
        let found = find_packages(tmp.path()).unwrap();
        assert_eq!(found.resources["foo"], set(&["bar/baz/f1", "bar/baz/f2", "f0"]));
    }

    #[test]
    fn test_find_packages_nearest_subpackage_honored() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &["foo", "foo.bar"],
            &[],
            &[("foo", "f0"), ("foo", "bar/baz/f1"), ("foo", "bar/baz/f2")],
        );
        let found = find_packages(tmp.path()).unwrap();
        assert_eq!(found.resources.len(), 2);
        assert_eq!(found.resources["foo"], set(&["f0"]));
        assert_eq!(found.resources["foo.bar"], set(&["baz/f1", "baz/f2"]));
    }

    #[test]
    fn test_find_packages_splits_on_module_boundaries() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["foo", "foo.bar"], &[], &[("foo.bar1", "f0")]);
        let found = find_packages(tmp.path()).unwrap();
        assert_eq!(found.resources.len(), 1);
        assert_eq!(found.resources["foo"], set(&["bar1/f0"]));
    }

    #[test]
    fn test_source_root_for_longest_prefix() {
        let roots = vec!["src/python".to_string(), "src".to_string()];
        assert_eq!(source_root_for("src/python/foo", &roots), "src/python");
        assert_eq!(source_root_for("src/java", &roots), "src");
        assert_eq!(source_root_for("srcs/x", &roots), "");
        assert_eq!(source_root_for("src/python", &roots), "src/python");
    }

    #[test]
    fn test_setup_keywords_render() {
        let keywords = SetupKeywords {
            name: "foo".to_string(),
            version: "0.0.0".to_string(),
            install_requires: vec!["bar==0.0.0".to_string()],
            ..SetupKeywords::default()
        };
        let rendered = keywords.render("foo:foo").unwrap();
        assert!(rendered.contains("# Target: foo:foo"));
        assert!(rendered.contains("setup(**{"));
        assert!(rendered.contains("\"install_requires\": [\n    \"bar==0.0.0\"\n  ]"));
        assert!(!rendered.contains("packages"));
    }

    #[test]
    fn test_prepare_chroot_with_resources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        create_file(root, "src/python/monster/j-function.res", "196884");
        create_file(root, "src/python/monster/__init__.py", "");
        create_file(
            root,
            "src/python/monster/research_programme.py",
            "# Look for more off-by-one \"errors\"!",
        );

        let mut fx = GraphFixture::new();
        fx.resources("src/python/monster:j-function")
            .with_sources(&["j-function.res"]);
        fx.published(
            "src/python/monster:conway",
            "monstrous.moonshine",
            &[":j-function"],
        )
        .with_sources(&["__init__.py", "research_programme.py"]);
        let ws = fx.workspace(root);

        let calc = DependencyCalculator::new(ws.graph());
        let conway = ws.graph().lookup_spec("src/python/monster:conway").unwrap();
        let chroot = prepare_chroot(&ws, &calc, conway).unwrap();

        assert_eq!(chroot.stem, "monstrous.moonshine-0.0.0");
        assert_eq!(chroot.dir, root.join("dist/monstrous.moonshine-0.0.0"));
        assert_eq!(
            crate::util::fs::walk_files(&chroot.dir).unwrap(),
            vec![
                PathBuf::from("setup.py"),
                PathBuf::from("src/monster/__init__.py"),
                PathBuf::from("src/monster/j-function.res"),
                PathBuf::from("src/monster/research_programme.py"),
            ]
        );
        assert_eq!(chroot.keywords.packages, Some(pkgs(&["monster"])));
        assert_eq!(
            chroot.keywords.package_data.as_ref().unwrap()["monster"],
            pkgs(&["j-function.res"])
        );
    }

    #[test]
    fn test_prepare_chroot_copies_parent_init_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        create_file(root, "src/python/foo/__init__.py", "");
        create_file(root, "src/python/foo/commands/print_sys_path.py", "pass");

        let mut fx = GraphFixture::new();
        fx.library("src/python/foo/commands", &[])
            .with_sources(&["print_sys_path.py"]);
        fx.published("src/python/foo", "foo", &["src/python/foo/commands"]);
        let ws = fx.workspace(root);

        let calc = DependencyCalculator::new(ws.graph());
        let foo = ws.graph().lookup_spec("src/python/foo").unwrap();
        let chroot = prepare_chroot(&ws, &calc, foo).unwrap();

        assert!(chroot.dir.join("src/foo/__init__.py").is_file());
        assert!(chroot.dir.join("src/foo/commands/print_sys_path.py").is_file());
        // `foo/commands` has no __init__.py, so it is not a package and its
        // module is logged and carried as data of `foo`.
        assert_eq!(chroot.keywords.packages, Some(pkgs(&["foo"])));
    }

    #[test]
    fn test_prepare_chroot_entry_points_and_requires() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        create_file(root, "foo/bin/main.py", "def foo(): pass");

        let mut fx = GraphFixture::new();
        fx.requirement("3rdparty:req", &["req==1.0"]);
        fx.binary("foo/bin", "foo.bin:foo", &["//3rdparty:req"])
            .with_sources(&["main.py"]);
        fx.published("foo", "foo", &[]).with_binary("foo_binary", "foo/bin");
        let ws = fx.workspace(root);

        let calc = DependencyCalculator::new(ws.graph());
        let foo = ws.graph().lookup_spec("foo").unwrap();
        let chroot = prepare_chroot(&ws, &calc, foo).unwrap();

        assert_eq!(chroot.keywords.install_requires, pkgs(&["req==1.0"]));
        assert_eq!(
            chroot.keywords.entry_points.as_ref().unwrap()["console_scripts"],
            pkgs(&["foo_binary = foo.bin:foo"])
        );
        assert!(chroot.dir.join("src/foo/bin/main.py").is_file());
    }
}
