//! Trait seams for platform collaborators.
//!
//! Shortcut-link resolution, executable version metadata, the App Paths
//! registry and process spawning are external concerns: the discovery
//! pipeline only ever sees these traits. The default implementations cover
//! the plain-filesystem cases; tests substitute fakes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::catalog::LaunchAction;

use super::error::DiscoveryError;

/// A resolved shortcut link: its target, plus the description embedded in
/// the link when the link format carries one.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    pub target: PathBuf,
    pub description: Option<String>,
}

/// Resolves a shortcut file to its target.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, link: &Path) -> Result<LinkTarget, DiscoveryError>;
}

/// Follows filesystem links, the shortcut mechanism native to the platforms
/// this crate builds on. Filesystem links embed no description.
#[derive(Debug, Default)]
pub struct FsLinkResolver;

impl LinkResolver for FsLinkResolver {
    fn resolve(&self, link: &Path) -> Result<LinkTarget, DiscoveryError> {
        let target = fs::read_link(link).map_err(|e| DiscoveryError::LinkResolution {
            path: link.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Relative targets are relative to the link's directory.
        let target = if target.is_absolute() {
            target
        } else {
            link.parent().map(|p| p.join(&target)).unwrap_or(target)
        };

        Ok(LinkTarget {
            target,
            description: None,
        })
    }
}

/// Version-resource description of an executable, `None` when the platform
/// or the file has none.
pub trait ExecutableMetadata: Send + Sync {
    fn description(&self, executable: &Path) -> Option<String>;
}

/// Platforms without version resources: always `None`.
#[derive(Debug, Default)]
pub struct NoMetadata;

impl ExecutableMetadata for NoMetadata {
    fn description(&self, _executable: &Path) -> Option<String> {
        None
    }
}

/// One raw value row from the App Paths provider. Reads are guarded per
/// subkey so a single denied key cannot abort enumeration.
#[derive(Debug)]
pub struct AppPathsValue {
    pub subkey: String,
    pub value: Result<String, DiscoveryError>,
}

/// Yields raw installed-executable path strings, one per registry subkey.
pub trait AppPathsProvider: Send + Sync {
    fn entries(&self) -> Vec<AppPathsValue>;
}

/// Platforms without an App Paths registry: yields nothing.
#[derive(Debug, Default)]
pub struct NoAppPaths;

impl AppPathsProvider for NoAppPaths {
    fn entries(&self) -> Vec<AppPathsValue> {
        Vec::new()
    }
}

/// Starts a launch action as a detached child process.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, action: &LaunchAction) -> Result<(), DiscoveryError>;
}

#[derive(Debug, Default)]
pub struct ShellSpawner;

impl ProcessSpawner for ShellSpawner {
    fn spawn(&self, action: &LaunchAction) -> Result<(), DiscoveryError> {
        let mut command = Command::new(&action.target);
        if !action.working_directory.is_empty() {
            command.current_dir(&action.working_directory);
        }
        command
            .spawn()
            .map(|_| ())
            .map_err(|source| DiscoveryError::Spawn {
                target: action.target.clone(),
                source,
            })
    }
}
