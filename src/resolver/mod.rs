//! Node package resolution.
//!
//! The [`ResolveExecutor`] walks resolvable targets in dependency order and
//! hands each invalid one to the resolver registered for its exact kind in
//! a [`ResolverRegistry`]. Results are published as [`NodePaths`].

pub mod artifact_cache;
pub mod errors;
pub mod executor;
pub mod invalidation;
pub mod node_paths;
pub mod registry;
pub mod resolvers;

pub use errors::ResolveError;
pub use executor::{ResolveExecutor, ResolveMode, ResolveReport, TargetState};
pub use invalidation::{FingerprintStore, InvalidationOracle};
pub use node_paths::NodePaths;
pub use registry::ResolverRegistry;
pub use resolvers::{NodeResolver, NpmResolver, PreinstalledModuleResolver, ResolveContext, ResolveOptions};
