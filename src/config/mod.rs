use crate::console::VerbosityLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub verbosity: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: None,
            provider: None,
            model: None,
            temperature: None,
            verbosity: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let content =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            config
        };

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content).context("Failed to write config file")
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Failed to get home directory")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("palaver")
            .join("config.toml"))
    }

    pub fn get_verbosity(&self) -> VerbosityLevel {
        match self.verbosity.as_deref() {
            Some("quiet") => VerbosityLevel::Quiet,
            Some("verbose") => VerbosityLevel::Verbose,
            Some("debug") => VerbosityLevel::Debug,
            _ => VerbosityLevel::Normal,
        }
    }

    pub fn set_value(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "base_url" => self.base_url = value,
            "api_token" => self.api_token = Some(value),
            "provider" => self.provider = Some(value),
            "model" => self.model = Some(value),
            "temperature" => {
                self.temperature =
                    Some(value.parse().context("temperature must be a number")?)
            }
            "verbosity" => self.verbosity = Some(value),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_points_at_localhost() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(config.api_token.is_none());
    }

    #[test]
    fn verbosity_parses_with_a_normal_fallback() {
        let mut config = AppConfig::default();
        assert_eq!(config.get_verbosity(), VerbosityLevel::Normal);

        config.verbosity = Some("debug".to_string());
        assert_eq!(config.get_verbosity(), VerbosityLevel::Debug);

        config.verbosity = Some("garbage".to_string());
        assert_eq!(config.get_verbosity(), VerbosityLevel::Normal);
    }

    #[test]
    fn load_creates_a_default_file_then_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let created = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.base_url, AppConfig::default().base_url);

        let mut updated = created;
        updated.set_value("base_url", "http://example.com".to_string())
            .unwrap();
        updated.set_value("model", "small".to_string()).unwrap();
        updated.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.base_url, "http://example.com");
        assert_eq!(reloaded.model.as_deref(), Some("small"));
    }

    #[test]
    fn set_value_rejects_unknown_keys_and_bad_numbers() {
        let mut config = AppConfig::default();
        assert!(config.set_value("nope", "x".to_string()).is_err());
        assert!(
            config
                .set_value("temperature", "warm".to_string())
                .is_err()
        );
        assert!(config.set_value("temperature", "0.7".to_string()).is_ok());
    }
}
