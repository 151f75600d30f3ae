//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/xstree/xstree.toml`
//! 3. Explicit config file passed by the caller
//! 4. Environment variables: `XSTREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, SaveOptions};
use crate::infrastructure::{FsStore, StoreResult};

/// Defaults applied by `export_all` when the caller has no opinion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    /// Write every non-empty value, dirty or not
    pub force: bool,
    /// Also delete store children that are missing in memory
    pub sync: bool,
}

impl From<&ExportConfig> for SaveOptions {
    fn from(cfg: &ExportConfig) -> Self {
        SaveOptions {
            force: cfg.force,
            sync: cfg.sync,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Root directory of the filesystem store
    pub store_root: PathBuf,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Raw export section; `None` means "inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawExportConfig {
    pub force: Option<bool>,
    pub sync: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_root: Option<PathBuf>,
    pub export: RawExportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            export: ExportConfig::default(),
        }
    }
}

/// `~/.local/share/xstree/store` or the platform equivalent.
fn default_store_root() -> PathBuf {
    ProjectDirs::from("", "", "xstree")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from("~/.xstree/store"))
}

/// Get the XDG config directory for xstree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "xstree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("xstree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ApplicationError::configuration(format!("read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| ApplicationError::configuration(format!("parse {}: {}", path.display(), e)))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// A missing global file is skipped; a missing `explicit` file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        let current = Self::load_files(global.as_deref(), explicit)?;
        let mut current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Defaults overlaid with the given files, without env overrides.
    pub fn load_files(
        global: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();
        for path in [global, explicit].into_iter().flatten() {
            debug!("load config: {}", path.display());
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }
        current.expand_paths();
        Ok(current)
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_root: overlay
                .store_root
                .clone()
                .unwrap_or_else(|| self.store_root.clone()),
            export: ExportConfig {
                force: overlay.export.force.unwrap_or(self.export.force),
                sync: overlay.export.sync.unwrap_or(self.export.sync),
            },
        }
    }

    /// Apply XSTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("XSTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_root") {
            settings.store_root = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("export.force") {
            settings.export.force = val;
        }
        if let Ok(val) = config.get_bool("export.sync") {
            settings.export.sync = val;
        }
        Ok(settings)
    }

    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.store_root.to_string_lossy().as_ref());
        self.store_root = PathBuf::from(expanded);
    }

    /// Open the filesystem store at `store_root`.
    pub fn open_store(&self) -> StoreResult<FsStore> {
        FsStore::open(self.store_root.clone())
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions::from(&self.export)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApplicationError::configuration(format!("serialize config: {e}")))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# xstree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/xstree/xstree.toml
#   Explicit: file passed to Settings::load
#   Env:      XSTREE_* variables, e.g. XSTREE_EXPORT__SYNC=true

# Directory of the filesystem store
# store_root = "~/.local/share/xstree/store"

[export]
# Write all values on export, not only changed ones
# force = false

# Also delete store entries that have no in-memory counterpart
# sync = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::configuration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn given_no_files_when_loading_then_uses_defaults() {
        let settings = Settings::load_files(None, None).expect("load defaults");
        assert!(settings.store_root.to_string_lossy().contains("xstree"));
        assert_eq!(settings.export, ExportConfig::default());
    }

    #[test]
    fn given_explicit_file_when_loading_then_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let local = tmp.path().join("local.toml");
        fs::write(&global, "store_root = \"/srv/global\"\n[export]\nforce = true\n").unwrap();
        fs::write(&local, "[export]\nsync = true\n").unwrap();

        let settings = Settings::load_files(Some(&global), Some(&local)).unwrap();

        assert_eq!(settings.store_root, PathBuf::from("/srv/global"));
        assert!(settings.export.force);
        assert!(settings.export.sync);
    }

    #[test]
    fn given_missing_explicit_file_when_loading_then_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let err = Settings::load_files(None, Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ApplicationError::Configuration { .. }));
    }

    #[test]
    fn given_broken_toml_when_loading_then_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "store_root = [").unwrap();
        let err = Settings::load_files(None, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn given_tilde_in_store_root_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            store_root: PathBuf::from("~/xs"),
            export: ExportConfig::default(),
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.store_root.to_string_lossy().starts_with(&home));
        assert!(!settings.store_root.to_string_lossy().contains('~'));
    }

    #[test]
    fn given_settings_when_to_toml_then_parses_back() {
        let settings = Settings {
            store_root: PathBuf::from("/srv/xs"),
            export: ExportConfig {
                force: true,
                sync: false,
            },
        };
        let text = settings.to_toml().unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.store_root.is_none());
        assert!(raw.export.force.is_none());
    }

    #[test]
    fn given_export_config_when_converting_then_save_options_match() {
        let settings = Settings {
            store_root: PathBuf::from("/tmp"),
            export: ExportConfig {
                force: false,
                sync: true,
            },
        };
        assert_eq!(settings.save_options(), SaveOptions::sync());
    }

    #[test]
    fn given_store_root_when_opening_store_then_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            store_root: tmp.path().join("nested/store"),
            export: ExportConfig::default(),
        };
        let store = settings.open_store().unwrap();
        assert!(store.root().is_dir());
    }
}
