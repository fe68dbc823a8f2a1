//! Application settings loading from config.toml and environment variables.
//!
//! Settings are optional everywhere: a missing config file yields the
//! defaults, and individual environment variables override whatever the
//! file provided.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Runtime settings for the splitter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Currency code used for display and export (receipts are not
    /// multi-currency within a session)
    pub currency: String,
    /// Tesseract language string, e.g. `eng+deu`
    pub ocr_languages: String,
    /// Translation language pair, e.g. `de|en`
    pub translation_langpair: String,
    /// Override for the translation endpoint (self-hosted mirrors)
    pub translation_endpoint: Option<String>,
    /// OCR lines at or below this confidence are discarded
    pub confidence_threshold: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            currency: "CHF".to_string(),
            ocr_languages: "eng+deu".to_string(),
            translation_langpair: "de|en".to_string(),
            translation_endpoint: None,
            confidence_threshold: 30,
        }
    }
}

impl AppConfig {
    /// Loads settings from a TOML file, falling back to defaults if the file
    /// does not exist, then applies environment variable overrides.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
                message: format!("Failed to read config file: {e}"),
            })?;
            toml::from_str(&contents).map_err(|e| Error::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            })?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads settings from the default location (./config.toml).
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        Self::load("config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(currency) = std::env::var("RECEIPT_CURRENCY") {
            if !currency.trim().is_empty() {
                self.currency = currency.trim().to_string();
            }
        }
        if let Ok(languages) = std::env::var("RECEIPT_OCR_LANGUAGES") {
            if !languages.trim().is_empty() {
                self.ocr_languages = languages.trim().to_string();
            }
        }
        if let Ok(langpair) = std::env::var("RECEIPT_TRANSLATION_LANGPAIR") {
            if !langpair.trim().is_empty() {
                self.translation_langpair = langpair.trim().to_string();
            }
        }
        if let Ok(endpoint) = std::env::var("RECEIPT_TRANSLATION_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.translation_endpoint = Some(endpoint.trim().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.currency, "CHF");
        assert_eq!(config.ocr_languages, "eng+deu");
        assert_eq!(config.translation_langpair, "de|en");
        assert_eq!(config.confidence_threshold, 30);
        assert!(config.translation_endpoint.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
            currency = "EUR"
            translation_langpair = "de|fr"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.currency, "EUR");
        assert_eq!(config.translation_langpair, "de|fr");
        // Unspecified fields keep their defaults.
        assert_eq!(config.ocr_languages, "eng+deu");
        assert_eq!(config.confidence_threshold, 30);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = AppConfig::load("does-not-exist.toml").expect("defaults");
        assert_eq!(config.currency, "CHF");
    }
}
