//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Addresses and targets
//! - The immutable target graph and build file loading
//! - Workspace management

pub mod address;
pub mod build_file;
pub mod graph;
pub mod target;
pub mod workspace;

pub use address::Address;
pub use graph::{GraphError, TargetGraph, TargetGraphBuilder, TargetId};
pub use target::{PackageManager, Payload, Provides, Target, TargetKind};
pub use workspace::{find_build_root, Workspace, DIST_DIR_NAME, WORK_DIR_NAME};
