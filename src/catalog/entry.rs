//! Program entries and their query-facing behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::scorer::{ScoreMatch, Scorer};

/// How a program was discovered, which governs how it was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Any allow-listed file taken as-is
    Direct,
    /// A shortcut-link file resolved to its target
    Shortcut,
    /// An internet-shortcut file carrying a protocol URL
    UrlShortcut,
    /// An executable enriched with version-resource metadata
    ExecutableWithMetadata,
}

/// One launchable program.
///
/// Identity is the lower-cased canonical path, see
/// [`ProgramEntry::unique_identifier`]. Entries with `valid == false` flow
/// through deduplication but never reach a published catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub display_name: String,
    pub description: String,
    pub icon_path: String,
    /// Canonical resolved executable path. For shortcuts this is the target,
    /// not the shortcut file.
    pub full_path: String,
    /// Set when launching goes through something other than `full_path`: the
    /// shortcut's own path, or a protocol URL.
    pub resolved_launch_path: Option<String>,
    pub parent_directory: String,
    /// Fallback label, scored only when the primary title fails to match.
    pub executable_hint: Option<String>,
    pub valid: bool,
    pub enabled: bool,
    pub kind: EntryKind,
}

/// What to start and where from. Execution is a [`ProcessSpawner`] concern.
///
/// [`ProcessSpawner`]: crate::discovery::providers::ProcessSpawner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchAction {
    pub target: String,
    pub working_directory: String,
}

impl ProgramEntry {
    /// Base descriptor for a discovered file. Shortcut and metadata
    /// resolution build on top of this.
    pub fn from_path(path: &Path) -> Self {
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_directory = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let full_path = path.to_string_lossy().into_owned();

        Self {
            display_name,
            description: String::new(),
            icon_path: full_path.clone(),
            full_path,
            resolved_launch_path: None,
            parent_directory,
            executable_hint: None,
            valid: true,
            enabled: true,
            kind: EntryKind::Direct,
        }
    }

    /// The explicit "absent" descriptor. It still occupies a slot in
    /// path-based grouping until the final validity filter removes it.
    pub fn invalid() -> Self {
        Self {
            display_name: String::new(),
            description: String::new(),
            icon_path: String::new(),
            full_path: String::new(),
            resolved_launch_path: None,
            parent_directory: String::new(),
            executable_hint: None,
            valid: false,
            enabled: false,
            kind: EntryKind::Direct,
        }
    }

    /// Lower-cased canonical path: the entry's identity, and the key that
    /// disabled entries are matched on.
    pub fn unique_identifier(&self) -> String {
        self.full_path.to_lowercase()
    }

    /// Launching a shortcut starts the shortcut itself so the target
    /// inherits its working directory and arguments.
    pub fn launch_action(&self) -> LaunchAction {
        LaunchAction {
            target: self
                .resolved_launch_path
                .clone()
                .unwrap_or_else(|| self.full_path.clone()),
            working_directory: self.parent_directory.clone(),
        }
    }

    /// Score this entry against a query, returning the display title and the
    /// match that won.
    ///
    /// The title is the name alone unless descriptions are surfaced and this
    /// entry carries one that adds information; name and description are
    /// scored separately when both appear. When the primary title misses,
    /// the executable hint gets one more try; a hint hit keeps the title but
    /// carries no highlight positions, since they would index into the wrong
    /// string.
    pub fn score_against(
        &self,
        query: &str,
        scorer: &dyn Scorer,
        enable_description: bool,
    ) -> Option<(String, ScoreMatch)> {
        let name = &self.display_name;
        let description = &self.description;

        let (title, primary) = if !enable_description
            || description.is_empty()
            || name.starts_with(description.as_str())
        {
            (name.clone(), scorer.score(query, name))
        } else if description.starts_with(name.as_str()) {
            (description.clone(), scorer.score(query, description))
        } else {
            let title = format!("{name}: {description}");
            let name_match = scorer.score(query, name);
            let description_match = scorer.score(query, description).map(|mut m| {
                let offset = name.len() + 2;
                for position in &mut m.positions {
                    *position += offset;
                }
                m
            });
            let best = match (name_match, description_match) {
                (Some(n), Some(d)) => Some(if d.score > n.score { d } else { n }),
                (matched, None) | (None, matched) => matched,
            };
            (title, best)
        };

        match primary {
            Some(matched) if matched.score > 0 => Some((title, matched)),
            _ => {
                let hint = self.executable_hint.as_deref()?;
                let matched = scorer.score(query, hint)?;
                if matched.score <= 0 {
                    return None;
                }
                Some((
                    title,
                    ScoreMatch {
                        score: matched.score,
                        positions: Vec::new(),
                    },
                ))
            }
        }
    }
}
