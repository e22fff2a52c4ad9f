use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const APP_DIR: &str = "nlsql-tui";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
    // Relative paths are resolved against the app directory
    pub log_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;
        Ok(())
    }

    /// Applies command-line / environment overrides on top of the file values.
    pub fn with_overrides(mut self, api_url: Option<String>, log_level: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if self.log_file.is_absolute() {
            return Ok(self.log_file.clone());
        }
        Ok(app_dir()?.join(&self.log_file))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(app_dir()?.join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("nlsql.log"),
        }
    }
}

/// Per-user directory holding the config, the client state and the log.
pub fn app_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    path.push(APP_DIR);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("nlsql-tui-missing-config.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_other_fields() {
        let path = std::env::temp_dir().join(format!("nlsql-tui-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"api_url":"https://nlsql.example.com"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.api_url, "https://nlsql.example.com");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir()
            .join(format!("nlsql-tui-save-{}", std::process::id()))
            .join("config.json");
        let config = Config::default().with_overrides(Some("https://api.example.com".to_string()), None);
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn overrides_win_and_trailing_slash_is_dropped() {
        let config = Config::default()
            .with_overrides(Some("http://api.internal:9000/".to_string()), Some("debug".to_string()));
        assert_eq!(config.api_url, "http://api.internal:9000");
        assert_eq!(config.log_level, "debug");
    }
}
