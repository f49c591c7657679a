//! High-level operations.
//!
//! This module contains the implementation of Quay commands.

pub mod clean;
pub mod karma;
pub mod node_install;
pub mod owners;
pub mod resolve;
pub mod setup_py;

pub use clean::{clean, invalidate};
pub use karma::{run_karma_tests, test, KarmaError};
pub use node_install::node_install;
pub use owners::{format_reports, owners, OwnerReport};
pub use resolve::{default_registry, resolve, ResolveRunOptions};
pub use setup_py::{setup_py, SetupPyOptions};
