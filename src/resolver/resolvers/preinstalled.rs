//! Resolver for node modules whose dependencies ship as a prebuilt archive.

use std::path::Path;

use anyhow::Result;
use url::Url;

use crate::core::graph::TargetId;
use crate::core::target::Payload;
use crate::resolver::errors::ResolveError;
use crate::resolver::node_paths::NodePaths;
use crate::resolver::resolvers::{copy_sources, NodeResolver, ResolveContext, ResolveOptions};
use crate::util::archive::extract_tarball;

/// Copies sources and unpacks the dependencies archive next to them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreinstalledModuleResolver;

impl NodeResolver for PreinstalledModuleResolver {
    fn name(&self) -> &'static str {
        "preinstalled"
    }

    fn resolve_target(
        &self,
        ctx: &ResolveContext<'_>,
        target: TargetId,
        results_dir: &Path,
        _node_paths: &NodePaths,
        options: &ResolveOptions,
    ) -> Result<()> {
        let ws = ctx.workspace;
        let node = ws.target(target);
        if options.resolve_locally {
            return Err(ResolveError::LocalResolveUnsupported {
                target: node.address.clone(),
            }
            .into());
        }

        let Payload::NodePreinstalledModule {
            dependencies_archive_url,
            ..
        } = &node.payload
        else {
            anyhow::bail!("`{}` is not a preinstalled node module", node.address);
        };

        copy_sources(ws, target, results_dir)?;

        let url = Url::parse(dependencies_archive_url).map_err(|_| ResolveError::ArchiveName {
            target: node.address.clone(),
            url: dependencies_archive_url.clone(),
        })?;
        let file_name = archive_file_name(&url).ok_or_else(|| ResolveError::ArchiveName {
            target: node.address.clone(),
            url: dependencies_archive_url.clone(),
        })?;
        if !(file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz")) {
            return Err(ResolveError::Fetch {
                url: url.to_string(),
                message: format!("unsupported archive type `{}`", file_name),
            }
            .into());
        }

        tracing::info!("fetching dependencies of `{}` from {}", node.address, url);
        let data = fetch(&url, ws.config().fetch_timeout())?;
        extract_tarball(&data, results_dir, None)?;
        Ok(())
    }
}

/// Last segment of the URL path, if non-empty.
pub fn archive_file_name(url: &Url) -> Option<&str> {
    url.path()
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// Download `url` (`http`, `https` or `file`) into memory.
pub fn fetch(url: &Url, timeout: std::time::Duration) -> Result<Vec<u8>, ResolveError> {
    let fetch_error = |message: String| ResolveError::Fetch {
        url: url.to_string(),
        message,
    };

    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| fetch_error("not a local path".to_string()))?;
            std::fs::read(&path).map_err(|e| fetch_error(e.to_string()))
        }
        "http" | "https" => {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| fetch_error(e.to_string()))?;
            let response = client
                .get(url.clone())
                .send()
                .map_err(|e| fetch_error(e.to_string()))?;
            if !response.status().is_success() {
                return Err(fetch_error(format!("HTTP {}", response.status())));
            }
            let bytes = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
            Ok(bytes.to_vec())
        }
        other => Err(fetch_error(format!("unsupported scheme `{}`", other))),
    }
}
