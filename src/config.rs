//! Configuration for the program catalog.
//!
//! Layered settings:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `APPDEX_` and use double
//! underscores to separate nested levels:
//! - `APPDEX_ENABLE_PATH_SOURCE=false` sets `enable_path_source`
//! - `APPDEX_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".appdex";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Where the persisted catalog snapshot lives
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Manually configured program directories
    #[serde(default)]
    pub sources: Vec<ProgramSource>,

    /// Programs excluded from every rebuild, keyed by unique identifier
    #[serde(default)]
    pub disabled: Vec<DisabledEntry>,

    /// File suffixes recognized as launchable
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,

    /// Protocol prefixes a URL shortcut may carry
    #[serde(default = "default_protocols")]
    pub protocols: Vec<String>,

    /// Index executables registered under the App Paths registry key
    #[serde(default = "default_true")]
    pub enable_registry_source: bool,

    /// Index the start-menu folders
    #[serde(default = "default_true")]
    pub enable_start_menu_source: bool,

    /// Index entries of the executable search path, non-recursively
    #[serde(default = "default_true")]
    pub enable_path_source: bool,

    /// Surface program descriptions in result titles
    #[serde(default = "default_false")]
    pub enable_description: bool,

    /// Leave result subtitles empty instead of showing program paths
    #[serde(default = "default_false")]
    pub hide_apps_path: bool,

    /// Start-menu folders; empty means the platform defaults
    #[serde(default)]
    pub start_menu_paths: Vec<PathBuf>,

    /// Worker threads shared by scans and scoring
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// When the last full rebuild completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_index_time: Option<DateTime<Utc>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One custom program directory with its enabled flag.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub location: PathBuf,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A program the user switched off. Owned by configuration so it outlasts
/// catalog rebuilds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DisabledEntry {
    /// Lower-cased canonical path of the excluded program
    pub unique_identifier: String,

    /// Display name at the time it was disabled
    #[serde(default)]
    pub name: String,

    /// Directory it was discovered in
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_data_path() -> PathBuf {
    PathBuf::from(".appdex/catalog")
}
fn default_suffixes() -> Vec<String> {
    vec![
        "exe".to_string(),
        "lnk".to_string(),
        "url".to_string(),
        "bat".to_string(),
        "appref-ms".to_string(),
    ]
}
fn default_protocols() -> Vec<String> {
    vec![
        "http".to_string(),
        "https".to_string(),
        "steam".to_string(),
        "com.epicgames.launcher".to_string(),
    ]
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_path: default_data_path(),
            sources: Vec::new(),
            disabled: Vec::new(),
            suffixes: default_suffixes(),
            protocols: default_protocols(),
            enable_registry_source: true,
            enable_start_menu_source: true,
            enable_path_source: true,
            enable_description: false,
            hide_apps_path: false,
            start_menu_paths: Vec::new(),
            parallel_threads: default_parallel_threads(),
            last_index_time: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with APPDEX_ prefix.
            // Double underscore separates nested levels; single underscores
            // remain as is within field names.
            .merge(Env::prefixed("APPDEX_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for an `.appdex` directory,
    /// searching from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Get the workspace root directory (where `.appdex` is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            if ancestor.join(CONFIG_DIR).is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'appdex init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Load configuration from a specific file (defaults plus that file only)
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        settings.save(&config_path)?;

        if force {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!("Created default configuration at: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Configured start-menu folders, or the platform defaults when none are
    /// configured.
    pub fn start_menu_dirs(&self) -> Vec<PathBuf> {
        if !self.start_menu_paths.is_empty() {
            return self.start_menu_paths.clone();
        }

        // Per-user and all-users menus; the variables are simply absent on
        // platforms without them.
        ["APPDATA", "PROGRAMDATA"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|base| {
                PathBuf::from(base)
                    .join("Microsoft")
                    .join("Windows")
                    .join("Start Menu")
                    .join("Programs")
            })
            .collect()
    }

    /// Lower-cased identifiers of everything the user disabled.
    pub fn disabled_identifiers(&self) -> HashSet<String> {
        self.disabled
            .iter()
            .map(|d| d.unique_identifier.to_lowercase())
            .collect()
    }

    /// Whether a program identifier is excluded from indexing.
    pub fn is_disabled(&self, unique_identifier: &str) -> bool {
        let key = unique_identifier.to_lowercase();
        self.disabled
            .iter()
            .any(|d| d.unique_identifier.to_lowercase() == key)
    }
}
