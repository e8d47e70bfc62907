use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use leizi_terminal::{CellMetrics, DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH, DEFAULT_SCROLLBACK_LINES};
use leizi_types::{BackendEndpoint, SavedConnection, Shortcut, DEFAULT_BACKEND_URL};

/// Get the Leizi data directory (~/.leizi), creating it if needed
pub fn get_leizi_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let leizi_dir = PathBuf::from(home_dir).join(".leizi");

    if !leizi_dir.exists() {
        std::fs::create_dir_all(&leizi_dir).context("Failed to create leizi directory")?;
    }

    Ok(leizi_dir)
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_leizi_dir()?.join("config.toml"))
}

fn default_cell_width() -> u32 {
    DEFAULT_CELL_WIDTH
}

fn default_cell_height() -> u32 {
    DEFAULT_CELL_HEIGHT
}

fn default_scrollback_lines() -> usize {
    DEFAULT_SCROLLBACK_LINES
}

/// Client configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (http or ws scheme)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Pixel size of one character cell, used to turn window sizes into grids
    #[serde(default = "default_cell_width")]
    pub cell_width: u32,
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,

    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: usize,

    #[serde(default)]
    pub shortcuts: Vec<Shortcut>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            shortcuts: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ClientConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Backend to talk to: command line first, then the config file
    pub fn endpoint(&self, override_url: Option<&str>) -> BackendEndpoint {
        let url = override_url
            .or(self.backend_url.as_deref())
            .unwrap_or(DEFAULT_BACKEND_URL);
        BackendEndpoint::new(url)
    }

    pub fn cell_metrics(&self) -> CellMetrics {
        CellMetrics::new(self.cell_width, self.cell_height)
    }

    pub fn find_shortcut(&self, name: &str) -> Option<&Shortcut> {
        self.shortcuts.iter().find(|s| s.name == name)
    }

    /// Shortcuts keyed by name, the shape the backend stores them in
    pub fn shortcut_map(&self) -> BTreeMap<String, SavedConnection> {
        self.shortcuts
            .iter()
            .map(|s| (s.name.clone(), s.connection.clone()))
            .collect()
    }

    /// Add or replace shortcuts by name. Returns how many were new.
    pub fn merge_shortcuts(&mut self, shortcuts: BTreeMap<String, SavedConnection>) -> usize {
        let mut added = 0;
        for (name, connection) in shortcuts {
            match self.shortcuts.iter_mut().find(|s| s.name == name) {
                Some(existing) => existing.connection = connection,
                None => {
                    self.shortcuts.push(Shortcut { name, connection });
                    added += 1;
                }
            }
        }
        added
    }
}
