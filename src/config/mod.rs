/// Theme preference persistence
pub mod prefs;

/// Application settings from config.toml and environment variables
pub mod settings;

pub use prefs::Prefs;
pub use settings::AppConfig;
