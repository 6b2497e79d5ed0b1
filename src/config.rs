use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Generative model used for schema generation
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory holding the history file and the saved API key
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds a single page fetch may take before it is abandoned
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            model: default_model(),
            data_dir: default_data_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Parse(format!("invalid config file: {}", e)))?;
        Ok(config)
    }

    /// Loads the file when given, otherwise defaults, then applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var("WEBDRIVER_URL") {
            config.webdriver_url = url;
        }
        Ok(config)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    fn api_key_path(&self) -> PathBuf {
        self.data_dir.join("api_key")
    }

    /// Resolves the API key: explicit argument, then the GEMINI_API_KEY
    /// environment variable, then the saved key file.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(key) = explicit {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
        std::fs::read_to_string(self.api_key_path())
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Persists the API key for later runs
    pub fn save_api_key(&self, key: &str) -> Result<(), Error> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(
                "Please provide your Google AI Studio API key".to_string(),
            ));
        }
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.api_key_path(), trimmed)?;
        ::log::info!("Saved API key to {}", self.api_key_path().display());
        Ok(())
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default generative model
fn default_model() -> String {
    crate::gemini::DEFAULT_MODEL.to_string()
}

/// Default data directory, under the platform config directory
fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schema-forge")
}

/// Default per-page fetch budget
fn default_fetch_timeout_secs() -> u64 {
    90
}
