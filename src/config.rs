use std::{env, fs, path::PathBuf, time::Duration};

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cell::GeometrySettings;
use crate::tui::{KeyBinding, KeyBindings};

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Per-cell settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellConfig {
    pub width_padding: u32,
    pub default_header_height: u32,
    pub description_padding: u32,
    pub timeout_secs: u64,
}

impl Default for CellConfig {
    fn default() -> Self {
        let geometry = GeometrySettings::default();
        Self {
            width_padding: geometry.width_padding,
            default_header_height: geometry.default_header_height,
            description_padding: geometry.description_padding,
            timeout_secs: 60,
        }
    }
}

impl CellConfig {
    pub fn geometry(&self) -> GeometrySettings {
        GeometrySettings {
            width_padding: self.width_padding,
            default_header_height: self.default_header_height,
            description_padding: self.description_padding,
        }
    }
}

/// Where value choices come from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 30,
        }
    }
}

impl LookupConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub cell: CellConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Overrides layered on top of the default bindings
    #[serde(default)]
    pub keybindings: Vec<KeyBinding>,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Embedded defaults, overlaid with `config_path` or `~/.dashcell-config.json5`
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            let home_cfg = default_home_config_path();
            if !home_cfg.exists() {
                // Seed the user file with the embedded defaults
                if let Some(parent) = home_cfg.parent()
                    && let Err(e) = fs::create_dir_all(parent)
                {
                    warn!("could not create {}: {e}", parent.display());
                }
                if let Err(e) = fs::write(&home_cfg, CONFIG) {
                    warn!("could not write {}: {e}", home_cfg.display());
                }
            }
            home_cfg
        };

        builder = builder.add_source(
            config::File::from(selected_path)
                .format(config::FileFormat::Json5)
                .required(config_path.is_some()),
        );

        builder.build()?.try_deserialize()
    }

    pub fn keybindings(&self) -> KeyBindings {
        KeyBindings::with_overrides(&self.keybindings)
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str()
        && s.starts_with('~')
        && let Some(base) = BaseDirs::new()
    {
        return PathBuf::from(s.replacen('~', &base.home_dir().to_string_lossy(), 1));
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".dashcell-config.json5");
    }
    PathBuf::from(".dashcell-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tui::Action;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dashcell.json5");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_embedded_defaults_fill_an_empty_file() {
        let (_dir, path) = write_config("{}");
        let cfg = Config::from_path(Some(&path)).unwrap();

        assert_eq!(cfg.cell, CellConfig::default());
        assert_eq!(cfg.lookup, LookupConfig::default());
        assert!(cfg.keybindings.is_empty());
        assert_eq!(cfg.config.data_dir, get_data_dir());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"{
                cell: { timeout_secs: 120 },
                lookup: { base_url: "http://localhost:8088" },
                keybindings: [{ key: "Ctrl+k", action: "MoveUp" }],
            }"#,
        );
        let cfg = Config::from_path(Some(&path)).unwrap();

        assert_eq!(cfg.cell.timeout_secs, 120);
        assert_eq!(cfg.cell.width_padding, 10);
        assert_eq!(cfg.cell.geometry(), GeometrySettings::default());
        assert_eq!(cfg.lookup.base_url.as_deref(), Some("http://localhost:8088"));
        assert_eq!(cfg.lookup.request_timeout(), Duration::from_secs(30));

        let ctrl_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        assert_eq!(cfg.keybindings().get_action(&ctrl_k), Some(Action::MoveUp));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json5");
        assert!(Config::from_path(Some(&missing)).is_err());
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        let plain = PathBuf::from("/etc/dashcell.json5");
        assert_eq!(expand_tilde(&plain), plain);
    }
}
