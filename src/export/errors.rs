//! Export error types and diagnostics.

use thiserror::Error;

use crate::core::Address;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error computing what a published target exports.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ExportError {
    #[error("no published target owns `{target}`")]
    #[diagnostic(code(quay::export::no_owner))]
    NoOwner { target: Address },

    #[error(
        "`{target}` is owned by more than one published target: {}",
        .owners.iter().map(Address::to_string).collect::<Vec<_>>().join(", ")
    )]
    #[diagnostic(code(quay::export::ambiguous_owner))]
    AmbiguousOwner { target: Address, owners: Vec<Address> },

    #[error("`{target}` is not a published target")]
    #[diagnostic(code(quay::export::not_published))]
    NotPublished { target: Address },

    #[error("binary `{name}` of `{owner}` ({binary}) {reason}")]
    #[diagnostic(code(quay::export::invalid_binary))]
    InvalidBinary {
        owner: Address,
        name: String,
        binary: Address,
        reason: String,
    },
}

impl ExportError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ExportError::NoOwner { target } => {
                Diagnostic::error(format!("no published target owns `{}`", target))
                    .with_context(format!(
                        "searched `{}` and every parent directory",
                        target.spec_path()
                    ))
                    .with_suggestion(suggestions::NO_OWNER)
            }

            ExportError::AmbiguousOwner { target, owners } => {
                let mut diag =
                    Diagnostic::error(format!("ambiguous owner for `{}`", target));
                for owner in owners {
                    diag = diag.with_context(format!("claimed by `{}`", owner));
                }
                diag.with_suggestion(suggestions::AMBIGUOUS_OWNER)
            }

            ExportError::NotPublished { target } => {
                Diagnostic::error(format!("`{}` is not a published target", target))
                    .with_suggestion(suggestions::NOT_PUBLISHED)
            }

            ExportError::InvalidBinary {
                owner,
                name,
                binary,
                reason,
            } => Diagnostic::error(format!("invalid binary `{}` in `{}`", name, owner))
                .with_context(format!("`{}` {}", binary, reason))
                .with_suggestion("Point the binary at a `binary` target with an `entry_point`"),
        }
    }
}
