use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mapper::ObjectParams;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Settings file, JSON. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    /// Largest dimension of a normalized object, in scene units.
    pub target_size: f32,
    pub default_params: ObjectParams,
    pub fallback_shapes: Vec<String>,
    pub fallback_textures: Vec<String>,
    pub fallback_colors: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: 30,
            target_size: 2.0,
            default_params: ObjectParams::default(),
            fallback_shapes: ["Cube", "Sphere", "Pyramid", "Prism", "Cylinder", "Cone", "Torus"]
                .map(String::from)
                .to_vec(),
            fallback_textures: ["stone", "metal", "wood"].map(String::from).to_vec(),
            fallback_colors: vec!["#6952BE".to_string()],
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_size.is_finite() && self.target_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "target_size must be positive, got {}",
                self.target_size
            )));
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
