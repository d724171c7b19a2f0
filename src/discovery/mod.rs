//! Multi-source program discovery: candidate enumeration and target
//! resolution.
//!
//! Enumeration yields candidate paths per source; resolution turns each
//! candidate into a typed [`ProgramEntry`]. Platform-specific concerns
//! (shortcut links, version resources, the App Paths registry) sit behind
//! trait seams in [`providers`].
//!
//! [`ProgramEntry`]: crate::catalog::ProgramEntry

pub mod enumerator;
pub mod error;
pub mod providers;
pub mod resolver;

pub use enumerator::SourceEnumerator;
pub use error::DiscoveryError;
pub use providers::{
    AppPathsProvider, AppPathsValue, ExecutableMetadata, FsLinkResolver, LinkResolver, LinkTarget,
    NoAppPaths, NoMetadata, ProcessSpawner, ShellSpawner,
};
pub use resolver::TargetResolver;

use std::path::Path;

/// Lower-cased file extension without the leading dot, empty when absent.
pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
