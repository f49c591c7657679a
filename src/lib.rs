//! Quay - dependency-aware build orchestration
//!
//! This crate provides the core library functionality for Quay: the target
//! graph, reduced dependencies and python packaging of published targets,
//! and topologically ordered, cached node package resolution.

pub mod core;
pub mod export;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for Quay unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides graph fixtures and a recording process runner.
#[cfg(test)]
pub mod test_support;

pub use core::{Address, Target, TargetGraph, TargetId, TargetKind, Workspace};
pub use export::{DependencyCalculator, ExportError, OwnershipResolver};
pub use resolver::{NodePaths, ResolveError, ResolverRegistry};
pub use util::context::GlobalContext;
