//! Candidate-path enumeration across configured sources.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{ProgramSource, Settings};

use super::extension;
use super::providers::AppPathsProvider;

/// Walks enabled sources and yields candidate paths: suffix-filtered,
/// de-duplicated per traversal, and stripped of disabled entries before any
/// resolution happens.
pub struct SourceEnumerator<'a> {
    settings: &'a Settings,
    disabled: HashSet<String>,
}

impl<'a> SourceEnumerator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            disabled: settings.disabled_identifiers(),
        }
    }

    /// Manually configured directories, scanned recursively in parallel.
    /// Disabled or missing sources are skipped.
    pub fn custom_sources(&self) -> Vec<PathBuf> {
        let sources: Vec<&ProgramSource> = self
            .settings
            .sources
            .iter()
            .filter(|s| s.enabled && s.location.is_dir())
            .collect();

        let found: Vec<PathBuf> = sources
            .par_iter()
            .flat_map_iter(|s| list_programs(&s.location, &self.settings.suffixes, true))
            .collect();

        self.except_disabled(distinct_paths(found))
    }

    /// Start-menu folders (per-user and common), recursive.
    pub fn start_menu(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for dir in self.settings.start_menu_dirs() {
            found.extend(list_programs(&dir, &self.settings.suffixes, true));
        }

        self.except_disabled(distinct_paths(found))
    }

    /// Entries of the executable search path. Non-recursive: only files
    /// sitting directly in a PATH directory count.
    pub fn search_path(&self) -> Vec<PathBuf> {
        let Some(raw) = env::var_os("PATH") else {
            return Vec::new();
        };

        let dirs: Vec<PathBuf> = distinct_paths(env::split_paths(&raw));
        let found: Vec<PathBuf> = dirs
            .par_iter()
            .flat_map_iter(|dir| list_programs(dir, &self.settings.suffixes, false))
            .collect();

        self.except_disabled(distinct_paths(found))
    }

    /// Raw registry values, trimmed of surrounding quotes and spaces and
    /// suffix-filtered. Unreadable subkeys are logged and skipped.
    pub fn app_paths(&self, provider: &dyn AppPathsProvider) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for row in provider.entries() {
            let value = match row.value {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("skipping App Paths subkey {}: {e}", row.subkey);
                    continue;
                }
            };

            // Registry values look like: "\"C:\\folder\\executable.exe\""
            let trimmed = value.trim_matches(&['"', ' '][..]);
            if trimmed.is_empty() {
                continue;
            }
            found.push(PathBuf::from(trimmed));
        }

        let found = found
            .into_iter()
            .filter(|p| self.matches_suffix(p));
        self.except_disabled(distinct_paths(found))
    }

    fn matches_suffix(&self, path: &Path) -> bool {
        let suffix = extension(path);
        self.settings.suffixes.iter().any(|s| *s == suffix)
    }

    fn except_disabled(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        if self.disabled.is_empty() {
            return paths;
        }
        paths
            .into_iter()
            .filter(|p| !self.disabled.contains(&p.to_string_lossy().to_lowercase()))
            .collect()
    }
}

/// List allow-listed files under a directory. Traversal errors are
/// swallowed: inaccessible subtrees are routine on real machines.
pub(crate) fn list_programs(dir: &Path, suffixes: &[String], recursive: bool) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut walk = WalkDir::new(dir);
    if !recursive {
        walk = walk.max_depth(1);
    }

    walk.into_iter()
        .filter_map(Result::ok)
        // Links count as files here; the resolver decides what they mean.
        .filter(|entry| entry.file_type().is_file() || entry.file_type().is_symlink())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let suffix = extension(path);
            suffixes.iter().any(|s| *s == suffix)
        })
        .collect()
}

/// Case-insensitive de-duplication preserving first-seen order.
fn distinct_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.to_string_lossy().to_lowercase()))
        .collect()
}
