//! Command implementations

pub mod clean;
pub mod invalidate;
pub mod node_install;
pub mod owners;
pub mod resolve;
pub mod resolve_local;
pub mod setup_py;
