use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR_PREFIX: &str = "csv-to-sheets";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub google: GoogleConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadConfig {
    /// ID of the target spreadsheet, as it appears in its URL.
    pub spreadsheet_id: String,
    /// Sheet tab that rows are appended to.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// CSV file whose data rows are appended.
    pub csv_path: PathBuf,
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            csv_path: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        if !config_path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {:?}. Please create one.",
                config_path
            )));
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.google.client_id.is_empty() || config.google.client_secret.is_empty() {
            return Err(AppError::Config(
                "Google client_id and client_secret must be set in config file".to_string(),
            ));
        }

        if config.upload.spreadsheet_id.is_empty() {
            return Err(AppError::Config(
                "upload.spreadsheet_id must be set in config file".to_string(),
            ));
        }

        if config.upload.csv_path.as_os_str().is_empty() {
            return Err(AppError::Config(
                "upload.csv_path must be set in config file".to_string(),
            ));
        }

        Ok(config)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get a cache file path
    pub fn cache_file(filename: &str) -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.place_cache_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create cache file path: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            google: GoogleConfig {
                client_id: "test_client_id".to_string(),
                client_secret: "test_client_secret".to_string(),
            },
            upload: UploadConfig {
                spreadsheet_id: "test_spreadsheet".to_string(),
                sheet_name: "Ledger".to_string(),
                csv_path: PathBuf::from("/data/input.csv"),
            },
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.google.client_id, deserialized.google.client_id);
        assert_eq!(
            config.upload.spreadsheet_id,
            deserialized.upload.spreadsheet_id
        );
        assert_eq!(config.upload.sheet_name, deserialized.upload.sheet_name);
        assert_eq!(config.upload.csv_path, deserialized.upload.csv_path);
    }

    #[test]
    fn test_sheet_name_defaults() {
        let toml_str = r#"
            [google]
            client_id = "id"
            client_secret = "secret"

            [upload]
            spreadsheet_id = "abc123"
            csv_path = "/data/input.csv"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.upload.sheet_name, "Sheet1");
    }
}
