//! Theme preference persistence.
//!
//! The single piece of state that survives a session: a dark/light theme
//! flag, stored under a fixed key in a small TOML file in the user's config
//! directory. Read at startup, written on every toggle. Nothing else is
//! persisted.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name the preference is stored under, inside the app config dir.
const PREFS_FILE: &str = "prefs.toml";

/// Persisted user preferences.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Whether the dark theme variant of roommate colors is used
    pub dark_mode: bool,
}

impl Prefs {
    /// Loads preferences from the default config directory. A missing or
    /// unreadable file yields the default (light theme) rather than an
    /// error, since losing a theme flag is not worth failing startup over.
    #[must_use]
    pub fn load() -> Self {
        default_dir().map_or_else(Self::default, |dir| Self::load_from(&dir))
    }

    /// Loads preferences from a specific directory.
    #[must_use]
    pub fn load_from(dir: &Path) -> Self {
        let path = dir.join(PREFS_FILE);
        std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| toml::from_str(&contents).ok())
            .unwrap_or_default()
    }

    /// Flips the theme flag and persists it immediately.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be created or the
    /// file cannot be written.
    pub fn toggle_dark_mode(&mut self) -> Result<bool> {
        self.dark_mode = !self.dark_mode;
        let dir = default_dir().ok_or_else(|| Error::Config {
            message: "no user config directory available".to_string(),
        })?;
        self.save_to(&dir)?;
        Ok(self.dark_mode)
    }

    /// Writes preferences into a specific directory, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let contents = toml::to_string(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize preferences: {e}"),
        })?;
        std::fs::write(dir.join(PREFS_FILE), contents)?;
        Ok(())
    }
}

fn default_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("receipt-splitter"))
}
