//! Turns one candidate path into a typed program descriptor.

use std::borrow::Cow;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::{EntryKind, ProgramEntry};

use super::extension;
use super::providers::{ExecutableMetadata, LinkResolver};

const SHORTCUT_SUFFIX: &str = "lnk";
const URL_SUFFIX: &str = "url";
const EXECUTABLE_SUFFIX: &str = "exe";

/// Resolves candidate paths into [`ProgramEntry`] values, dispatching on the
/// file suffix.
pub struct TargetResolver<'a> {
    links: &'a dyn LinkResolver,
    metadata: &'a dyn ExecutableMetadata,
    protocols: &'a [String],
}

impl<'a> TargetResolver<'a> {
    pub fn new(
        links: &'a dyn LinkResolver,
        metadata: &'a dyn ExecutableMetadata,
        protocols: &'a [String],
    ) -> Self {
        Self {
            links,
            metadata,
            protocols,
        }
    }

    /// Resolve one candidate path.
    ///
    /// Inaccessible or vanished candidates come back as the invalid
    /// descriptor rather than an error, so they still occupy their slot in
    /// path-based grouping before the final validity filter.
    pub fn resolve(&self, raw: &Path) -> ProgramEntry {
        let raw = raw.to_string_lossy();
        if raw.is_empty() {
            return ProgramEntry::invalid();
        }

        let expanded = expand_env_vars(&raw);
        let path = PathBuf::from(expanded.as_ref());
        match fs::symlink_metadata(&path) {
            // A dangling link still counts: the shortcut file itself exists
            // even when its target is gone.
            Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => {}
            Ok(_) => return ProgramEntry::invalid(),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                tracing::warn!(
                    "permission denied loading program from {}: {e}",
                    path.display()
                );
                return ProgramEntry::invalid();
            }
            Err(_) => return ProgramEntry::invalid(),
        }

        match extension(&path).as_str() {
            SHORTCUT_SUFFIX => self.resolve_shortcut(&path),
            URL_SUFFIX => self.resolve_url(&path),
            EXECUTABLE_SUFFIX => self.resolve_executable(&path),
            _ => ProgramEntry::from_path(&path),
        }
    }

    /// A shortcut whose target is an existing executable launches through
    /// the shortcut itself; its identity becomes the target's canonical
    /// path so duplicates collapse across shortcut locations.
    fn resolve_shortcut(&self, path: &Path) -> ProgramEntry {
        let mut entry = ProgramEntry::from_path(path);
        entry.kind = EntryKind::Shortcut;

        let link = match self.links.resolve(path) {
            Ok(link) => link,
            Err(e) => {
                // Some installers leave shortcuts that never resolve. Keep
                // the entry so grouping sees it; validity filtering drops it.
                tracing::warn!("shortcut target unavailable: {e}");
                entry.valid = false;
                return entry;
            }
        };

        if extension(&link.target) == EXECUTABLE_SUFFIX && link.target.is_file() {
            entry.resolved_launch_path = Some(entry.full_path.clone());
            entry.full_path = canonical_lowercase(&link.target);
            entry.executable_hint = link
                .target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            entry.description = link
                .description
                .filter(|d| !d.is_empty())
                .or_else(|| self.metadata.description(&link.target))
                .unwrap_or_default();
        }

        entry
    }

    /// Internet shortcuts are key/value documents. Files without the URL
    /// field are routine, so every parse failure here stays silent.
    fn resolve_url(&self, path: &Path) -> ProgramEntry {
        let mut entry = ProgramEntry::from_path(path);
        entry.kind = EntryKind::UrlShortcut;
        entry.valid = false;

        let Ok(text) = fs::read_to_string(path) else {
            return entry;
        };
        let (url, icon) = url_shortcut_fields(&text);

        if let Some(url) = url.filter(|u| !u.is_empty()) {
            if self.protocols.iter().any(|p| url.starts_with(p.as_str())) {
                entry.resolved_launch_path = Some(url);
                entry.valid = true;
            }
        }
        if let Some(icon) = icon.filter(|i| !i.is_empty()) {
            entry.icon_path = icon;
        }

        entry
    }

    fn resolve_executable(&self, path: &Path) -> ProgramEntry {
        let mut entry = ProgramEntry::from_path(path);
        entry.kind = EntryKind::ExecutableWithMetadata;
        if let Some(description) = self.metadata.description(path) {
            entry.description = description;
        }
        entry
    }
}

/// `URL` and `IconFile` values of the `[InternetShortcut]` section.
fn url_shortcut_fields(text: &str) -> (Option<String>, Option<String>) {
    let mut in_section = false;
    let mut url = None;
    let mut icon = None;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            in_section = line.eq_ignore_ascii_case("[InternetShortcut]");
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.eq_ignore_ascii_case("URL") {
                url = Some(value.trim().to_string());
            } else if key.eq_ignore_ascii_case("IconFile") {
                icon = Some(value.trim().to_string());
            }
        }
    }

    (url, icon)
}

fn canonical_lowercase(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_lowercase()
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%]+)%").expect("pattern is valid"));

/// Expand `%VAR%` references, leaving unknown variables untouched.
/// Registry-sourced paths routinely carry them.
pub(crate) fn expand_env_vars(raw: &str) -> Cow<'_, str> {
    ENV_VAR.replace_all(raw, |caps: &regex::Captures<'_>| {
        env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::providers::{LinkTarget, NoMetadata};
    use crate::discovery::DiscoveryError;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FakeLinks(HashMap<PathBuf, LinkTarget>);

    impl LinkResolver for FakeLinks {
        fn resolve(&self, link: &Path) -> Result<LinkTarget, DiscoveryError> {
            self.0
                .get(link)
                .cloned()
                .ok_or_else(|| DiscoveryError::LinkResolution {
                    path: link.to_path_buf(),
                    reason: "no such link".to_string(),
                })
        }
    }

    struct FakeMetadata(HashMap<PathBuf, String>);

    impl ExecutableMetadata for FakeMetadata {
        fn description(&self, executable: &Path) -> Option<String> {
            self.0.get(executable).cloned()
        }
    }

    fn no_links() -> FakeLinks {
        FakeLinks(HashMap::new())
    }

    #[test]
    fn test_direct_file_is_valid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.bat");
        fs::write(&path, b"").unwrap();

        let links = no_links();
        let resolver = TargetResolver::new(&links, &NoMetadata, &[]);
        let entry = resolver.resolve(&path);

        assert!(entry.valid);
        assert_eq!(entry.kind, EntryKind::Direct);
        assert_eq!(entry.display_name, "run");
    }

    #[test]
    fn test_missing_candidate_is_invalid() {
        let links = no_links();
        let resolver = TargetResolver::new(&links, &NoMetadata, &[]);
        let entry = resolver.resolve(Path::new("/no/such/file.exe"));
        assert!(!entry.valid);
    }

    #[test]
    fn test_executable_picks_up_metadata_description() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tool.exe");
        fs::write(&path, b"").unwrap();

        let links = no_links();
        let metadata = FakeMetadata(HashMap::from([(path.clone(), "A tool".to_string())]));
        let resolver = TargetResolver::new(&links, &metadata, &[]);
        let entry = resolver.resolve(&path);

        assert!(entry.valid);
        assert_eq!(entry.kind, EntryKind::ExecutableWithMetadata);
        assert_eq!(entry.description, "A tool");
    }

    #[test]
    fn test_shortcut_to_executable_rewires_paths() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Tool.exe");
        fs::write(&target, b"").unwrap();
        let link = temp_dir.path().join("tool.lnk");
        fs::write(&link, b"").unwrap();

        let links = FakeLinks(HashMap::from([(
            link.clone(),
            LinkTarget {
                target: target.clone(),
                description: Some("Launches the tool".to_string()),
            },
        )]));
        let resolver = TargetResolver::new(&links, &NoMetadata, &[]);
        let entry = resolver.resolve(&link);

        assert!(entry.valid);
        assert_eq!(entry.kind, EntryKind::Shortcut);
        assert_eq!(
            entry.resolved_launch_path.as_deref(),
            Some(link.to_string_lossy().as_ref())
        );
        assert_eq!(entry.full_path, canonical_lowercase(&target));
        assert_eq!(entry.executable_hint.as_deref(), Some("Tool.exe"));
        assert_eq!(entry.description, "Launches the tool");
    }

    #[test]
    fn test_shortcut_falls_back_to_target_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("tool.exe");
        fs::write(&target, b"").unwrap();
        let link = temp_dir.path().join("tool.lnk");
        fs::write(&link, b"").unwrap();

        let links = FakeLinks(HashMap::from([(
            link.clone(),
            LinkTarget {
                target: target.clone(),
                description: None,
            },
        )]));
        let metadata = FakeMetadata(HashMap::from([(target, "From version info".to_string())]));
        let resolver = TargetResolver::new(&links, &metadata, &[]);

        assert_eq!(resolver.resolve(&link).description, "From version info");
    }

    #[test]
    fn test_unresolvable_shortcut_is_kept_but_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("ghost.lnk");
        fs::write(&link, b"").unwrap();

        let links = no_links();
        let resolver = TargetResolver::new(&links, &NoMetadata, &[]);
        let entry = resolver.resolve(&link);

        assert!(!entry.valid);
        // Grouping still sees the shortcut's own path.
        assert_eq!(entry.full_path, link.to_string_lossy());
    }

    #[test]
    fn test_url_shortcut_with_allowed_protocol() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("game.url");
        fs::write(
            &path,
            "[InternetShortcut]\nURL=steam://run/440\nIconFile=/icons/game.ico\n",
        )
        .unwrap();

        let links = no_links();
        let protocols = vec!["steam".to_string()];
        let resolver = TargetResolver::new(&links, &NoMetadata, &protocols);
        let entry = resolver.resolve(&path);

        assert!(entry.valid);
        assert_eq!(entry.kind, EntryKind::UrlShortcut);
        assert_eq!(entry.resolved_launch_path.as_deref(), Some("steam://run/440"));
        assert_eq!(entry.icon_path, "/icons/game.ico");
    }

    #[test]
    fn test_url_shortcut_without_url_field_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.url");
        fs::write(&path, "[InternetShortcut]\nWorkingDirectory=/tmp\n").unwrap();

        let links = no_links();
        let protocols = vec!["http".to_string()];
        let resolver = TargetResolver::new(&links, &NoMetadata, &protocols);

        assert!(!resolver.resolve(&path).valid);
    }

    #[test]
    fn test_url_shortcut_with_disallowed_protocol_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weird.url");
        fs::write(&path, "[InternetShortcut]\nURL=gopher://old\n").unwrap();

        let links = no_links();
        let protocols = vec!["http".to_string()];
        let resolver = TargetResolver::new(&links, &NoMetadata, &protocols);

        assert!(!resolver.resolve(&path).valid);
    }

    #[test]
    fn test_url_shortcut_garbage_is_silently_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("noise.url");
        fs::write(&path, "not an ini at all \u{1}\u{2}").unwrap();

        let links = no_links();
        let resolver = TargetResolver::new(&links, &NoMetadata, &[]);
        assert!(!resolver.resolve(&path).valid);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("APPDEX_TEST_ROOT", "/opt");
        }
        assert_eq!(
            expand_env_vars("%APPDEX_TEST_ROOT%/bin/tool.exe"),
            "/opt/bin/tool.exe"
        );
        // Unknown variables stay untouched.
        assert_eq!(expand_env_vars("%NOPE_XYZ%/x"), "%NOPE_XYZ%/x");
        unsafe {
            std::env::remove_var("APPDEX_TEST_ROOT");
        }
    }
}
