use crate::constants::{INTERPRETATION_ENTRY_LIMIT_DEFAULT, INTERPRETATION_ENTRY_LIMIT_MAX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const JOURNAL_FILE: &str = "dreams.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_device: String,
    pub endpoint: String,
    pub model: String,
    pub image_model: String,
    pub interpretation_entry_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_device: "default".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.0-flash-preview-image-generation".to_string(),
            interpretation_entry_limit: INTERPRETATION_ENTRY_LIMIT_DEFAULT,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        let defaults = Settings::default();
        if self.input_device.trim().is_empty() {
            self.input_device = defaults.input_device;
        }
        if self.endpoint.trim().is_empty() {
            self.endpoint = defaults.endpoint;
        } else {
            self.endpoint = self.endpoint.trim().trim_end_matches('/').to_string();
        }
        if self.model.trim().is_empty() {
            self.model = defaults.model;
        }
        if self.image_model.trim().is_empty() {
            self.image_model = defaults.image_model;
        }
        self.interpretation_entry_limit = self
            .interpretation_entry_limit
            .clamp(1, INTERPRETATION_ENTRY_LIMIT_MAX);
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dream-recorder")
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dream-recorder")
}

/// Missing or unreadable settings fall back to defaults; whatever loads is
/// normalized before use.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        Err(_) => Settings::default(),
    };
    settings.normalize();
    settings
}

pub fn save_settings_file(path: &Path, settings: &Settings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;
    }
    let raw = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(path, raw).map_err(|e| e.to_string())
}
