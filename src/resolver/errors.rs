//! Resolve error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::Address;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while resolving node packages.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ResolveError {
    #[error("failed to resolve `{target}`")]
    #[diagnostic(code(quay::resolve::failed))]
    ResolutionFailed {
        target: Address,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("`{target}` has no package.json in {}", .dir.display())]
    #[diagnostic(code(quay::resolve::missing_package_json))]
    MissingPackageJson { target: Address, dir: PathBuf },

    #[error("package.json of `{target}` is named `{found}`, expected `{expected}`")]
    #[diagnostic(code(quay::resolve::package_name_mismatch))]
    PackageNameMismatch {
        target: Address,
        expected: String,
        found: String,
    },

    #[error("`{target}` cannot be resolved into its source directory")]
    #[diagnostic(code(quay::resolve::local_unsupported))]
    LocalResolveUnsupported { target: Address },

    #[error("`{command}` failed with exit code {code}")]
    #[diagnostic(code(quay::resolve::install_failed))]
    InstallFailed { command: String, code: i32 },

    #[error("could not determine archive file name for `{target}` from {url}")]
    #[diagnostic(code(quay::resolve::archive_name))]
    ArchiveName { target: Address, url: String },

    #[error("failed to fetch {url}: {message}")]
    #[diagnostic(code(quay::resolve::fetch))]
    Fetch { url: String, message: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ResolutionFailed { target, source } => {
                Diagnostic::error(format!("failed to resolve `{}`", target))
                    .with_context(source.to_string())
            }

            ResolveError::MissingPackageJson { target, dir } => {
                Diagnostic::error(format!("`{}` has no package.json", target))
                    .with_location(dir.join("package.json"))
                    .with_suggestion("Add a package.json to the target's sources")
            }

            ResolveError::PackageNameMismatch {
                target,
                expected,
                found,
            } => Diagnostic::error(format!("package name mismatch in `{}`", target))
                .with_context(format!("package.json says `{}`", found))
                .with_context(format!("the target expects `{}`", expected))
                .with_suggestion(format!(
                    "Set `package_name = \"{}\"` on the target or rename the package",
                    found
                )),

            ResolveError::LocalResolveUnsupported { target } => Diagnostic::error(format!(
                "`{}` cannot be resolved into its source directory",
                target
            ))
            .with_context("preinstalled modules are only resolved in isolation"),

            ResolveError::InstallFailed { command, code } => {
                Diagnostic::error(format!("install failed with exit code {}", code))
                    .with_context(format!("command: {}", command))
                    .with_suggestion(suggestions::INSTALL_FAILED)
            }

            ResolveError::ArchiveName { target, url } => Diagnostic::error(format!(
                "invalid dependencies archive url for `{}`",
                target
            ))
            .with_context(format!("url: {}", url))
            .with_suggestion("The url path must end in an archive file name such as deps.tar.gz"),

            ResolveError::Fetch { url, message } => {
                Diagnostic::error(format!("failed to fetch {}", url)).with_context(message.clone())
            }
        }
    }
}
