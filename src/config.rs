use crate::error::Result;
use directories::ProjectDirs;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Include the defaults at compile time
const DEFAULT_SETTINGS: &str = include_str!("../assets/settings.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub probe: ProbeSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogSettings {
    pub primary: String,
    pub secondary: String,
    pub locator: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
    pub ping_samples: u32,
    pub download_sizes: Vec<u32>,
    pub saving_download_sizes: Vec<u32>,
    pub upload_sizes_kb: Vec<u32>,
    pub saving_upload_sizes_kb: Vec<u32>,
}

impl CatalogSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load settings
    /// Strategy:
    /// 1. Start from the built-in assets/settings.toml
    /// 2. Overlay `explicit` if given, else ~/.config/speedprobe/settings.toml if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let overlay = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => user_config_path().filter(|p| p.exists()),
        };

        match overlay {
            Some(path) => {
                let content = fs::read_to_string(&path)?;
                let settings = Self::from_layers(&content)?;
                info!("Loaded settings from {:?}", path);
                Ok(settings)
            }
            None => Self::from_layers(""),
        }
    }

    /// Built-in defaults with `overlay` (TOML text) merged on top.
    pub fn from_layers(overlay: &str) -> Result<Self> {
        let mut base: toml::Table = toml::from_str(DEFAULT_SETTINGS)?;
        let overlay: toml::Table = toml::from_str(overlay)?;
        merge_tables(&mut base, overlay);
        Ok(toml::Value::Table(base).try_into()?)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "speedprobe").map(|dirs| dirs.config_dir().join("settings.toml"))
}

// 递归合并: 子表逐键合并, 其余值直接覆盖
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
