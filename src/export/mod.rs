//! Exporting published targets as python distributions.
//!
//! - [`ownership`]: which published target packages a given target
//! - [`reduced`]: the dependency set a distribution declares or carries
//! - [`setup_py`]: distribution chroots and generated `setup.py`
//! - [`sdist`]: archiving a chroot

pub mod errors;
pub mod ownership;
pub mod reduced;
pub mod sdist;
pub mod setup_py;

pub use errors::ExportError;
pub use ownership::OwnershipResolver;
pub use reduced::DependencyCalculator;
pub use sdist::{ArchiveWriter, TarGzWriter};
