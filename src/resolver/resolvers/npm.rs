//! npm / yarn resolver for `node_module` targets.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::core::graph::TargetId;
use crate::core::target::{PackageManager, Payload};
use crate::resolver::errors::ResolveError;
use crate::resolver::node_paths::NodePaths;
use crate::resolver::resolvers::{
    copy_sources, target_from_package_name, NodeResolver, ResolveContext, ResolveOptions,
};
use crate::util::fs::{read_to_string, relative_path, slash_path, write_string};
use crate::util::process::{resolve_executable, ProcessBuilder};

/// Installs a node module with its package manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmResolver;

impl NodeResolver for NpmResolver {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn resolve_target(
        &self,
        ctx: &ResolveContext<'_>,
        target: TargetId,
        results_dir: &Path,
        node_paths: &NodePaths,
        options: &ResolveOptions,
    ) -> Result<()> {
        let ws = ctx.workspace;
        let address = &ws.target(target).address;

        if !options.resolve_locally {
            copy_sources(ws, target, results_dir)?;
        }

        let package_json = results_dir.join("package.json");
        if !package_json.is_file() {
            return Err(ResolveError::MissingPackageJson {
                target: address.clone(),
                dir: results_dir.to_path_buf(),
            }
            .into());
        }

        if options.resolve_locally {
            check_local_references(ctx, target, &package_json)?;
        } else if results_dir.join("npm-shrinkwrap.json").exists() {
            tracing::debug!("`{}` has a shrinkwrap; leaving package.json untouched", address);
        } else {
            rewrite_package_json(ctx, target, &package_json, results_dir, node_paths)?;
        }

        let manager = match ws.target(target).package_manager() {
            Some(manager) => manager,
            None => ws.config().package_manager()?,
        };
        let cmd = install_command(manager, options).cwd(results_dir);

        tracing::info!("installing `{}` with {}", address, manager);
        let code = ctx.runner.run(&cmd)?;
        if code != 0 {
            return Err(ResolveError::InstallFailed {
                command: cmd.display_command(),
                code,
            }
            .into());
        }
        Ok(())
    }
}

/// The install invocation for `manager`, without a working directory.
pub fn install_command(manager: PackageManager, options: &ResolveOptions) -> ProcessBuilder {
    let mut args = vec!["install"];
    match manager {
        PackageManager::Npm => {
            if !options.install_optional {
                args.push("--no-optional");
            }
        }
        PackageManager::Yarn => {
            if options.frozen_lockfile {
                args.push("--frozen-lockfile");
            }
            if !options.install_optional {
                args.push("--ignore-optional");
            }
        }
    }
    if options.force {
        args.push("--force");
    }

    ProcessBuilder::new(resolve_executable(manager.executable()))
        .args(args)
        .args(&options.passthru)
}

/// Point each node package dependency of `target` at its resolved location.
///
/// Local modules become `file:` references relative to `results_dir`;
/// remote modules get their declared version. Other dependencies listed in
/// package.json are kept.
fn rewrite_package_json(
    ctx: &ResolveContext<'_>,
    target: TargetId,
    package_json: &Path,
    results_dir: &Path,
    node_paths: &NodePaths,
) -> Result<()> {
    let graph = ctx.graph();
    let node = graph.target(target);
    let expected = node.package_name().unwrap_or_else(|| node.address.name());

    let mut package = read_package_json(package_json)?;
    let found = package
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    match found {
        Some(found) if found != expected => {
            return Err(ResolveError::PackageNameMismatch {
                target: node.address.clone(),
                expected: expected.to_string(),
                found,
            }
            .into());
        }
        Some(_) => {}
        None => {
            package.insert("name".to_string(), Value::from(expected));
        }
    }
    package
        .entry("version")
        .or_insert_with(|| Value::from("0.0.0"));

    let mut dependencies = match package.remove("dependencies") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    for &dep in graph.dependencies_of(target) {
        let dep_target = graph.target(dep);
        let Some(package_name) = dep_target.package_name() else {
            continue;
        };
        let value = match &dep_target.payload {
            Payload::NodeRemoteModule { version, .. } => version.clone(),
            _ => match node_paths.node_path(dep) {
                Some(path) => format!("file:{}", slash_path(&relative_path(results_dir, path))),
                None => {
                    tracing::warn!(
                        "`{}` depends on unresolved `{}`",
                        node.address,
                        dep_target.address
                    );
                    continue;
                }
            },
        };
        dependencies.insert(package_name.to_string(), Value::from(value));
    }
    package.insert("dependencies".to_string(), Value::Object(dependencies));

    let json = serde_json::to_string_pretty(&Value::Object(package))
        .context("failed to serialize package.json")?;
    write_string(package_json, &json)
}

/// Warn about `file:` dependencies that do not match a declared dependency.
fn check_local_references(ctx: &ResolveContext<'_>, target: TargetId, package_json: &Path) -> Result<()> {
    let package = read_package_json(package_json)?;
    let Some(Value::Object(dependencies)) = package.get("dependencies") else {
        return Ok(());
    };
    for (name, value) in dependencies {
        let Some(reference) = value.as_str().filter(|v| v.starts_with("file:")) else {
            continue;
        };
        if target_from_package_name(ctx.graph(), target, name, reference)?.is_none() {
            tracing::warn!(
                "package.json of `{}` references {} ({}) which is not a declared dependency",
                ctx.graph().address_of(target),
                name,
                reference
            );
        }
    }
    Ok(())
}

fn read_package_json(path: &Path) -> Result<Map<String, Value>> {
    let contents = read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} is not a JSON object", path.display()),
    }
}
