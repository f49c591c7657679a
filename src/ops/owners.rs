//! Implementation of `quay owners`.
//!
//! Reports, for each requested target, the published target that packages
//! it and the reduced dependencies of published targets.

use anyhow::Result;
use indexmap::IndexSet;

use crate::core::graph::TargetId;
use crate::core::workspace::Workspace;
use crate::core::Address;
use crate::export::reduced::{install_requires, DependencyCalculator};

/// What `owners` reports about one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReport {
    pub target: Address,
    pub owner: Address,
    /// Reduced dependencies, for published targets only
    pub reduced: Option<Vec<Address>>,
    /// install_requires of the distribution, for published targets only
    pub install_requires: Option<Vec<String>>,
}

/// Owner and (for published targets) reduced dependencies of each target.
pub fn owners(ws: &Workspace, targets: &[TargetId]) -> Result<Vec<OwnerReport>> {
    let graph = ws.graph();
    let calc = DependencyCalculator::new(graph);

    targets
        .iter()
        .map(|&id| {
            let owner = calc.ownership().owner_of(id)?;
            let (reduced, requires) = if graph.target(id).is_published() {
                let reduced: IndexSet<TargetId> = calc.reduced_dependencies(id)?;
                let requires = install_requires(graph, &reduced).into_iter().collect();
                let reduced = reduced
                    .iter()
                    .map(|dep| graph.address_of(*dep).clone())
                    .collect();
                (Some(reduced), Some(requires))
            } else {
                (None, None)
            };
            Ok(OwnerReport {
                target: graph.address_of(id).clone(),
                owner: graph.address_of(owner).clone(),
                reduced,
                install_requires: requires,
            })
        })
        .collect()
}

/// Render reports the way the CLI prints them.
pub fn format_reports(reports: &[OwnerReport]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("{} -> {}\n", report.target, report.owner));
        if let Some(reduced) = &report.reduced {
            for dep in reduced {
                out.push_str(&format!("  depends on {}\n", dep));
            }
        }
        if let Some(requires) = &report.install_requires {
            for req in requires {
                out.push_str(&format!("  requires {}\n", req));
            }
        }
    }
    out
}
