use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const KEYRING_SERVICE: &str = "com.dream-recorder.analysis";
const KEYRING_USER: &str = "api-key";
const FALLBACK_KEY_FILE: &str = "analysis_key.json";

/// File fallback for machines where no system keyring is available
/// (headless sessions, stripped-down desktops).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FileKeyStore {
    key: Option<String>,
}

fn fallback_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(FALLBACK_KEY_FILE)
}

fn load_file_store(config_dir: &Path) -> Result<FileKeyStore, String> {
    let path = fallback_file_path(config_dir);
    if !path.exists() {
        return Ok(FileKeyStore::default());
    }
    let raw = fs::read_to_string(path).map_err(|e| format!("Failed to read key store: {}", e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Failed to parse key store: {}", e))
}

fn save_file_store(config_dir: &Path, store: &FileKeyStore) -> Result<(), String> {
    fs::create_dir_all(config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;
    let raw = serde_json::to_string_pretty(store)
        .map_err(|e| format!("Failed to serialize key store: {}", e))?;
    fs::write(fallback_file_path(config_dir), raw)
        .map_err(|e| format!("Failed to write key store: {}", e))
}

fn try_store_in_keyring(api_key: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| format!("Failed to create keyring entry: {}", e))?;
    entry
        .set_password(api_key)
        .map_err(|e| format!("Failed to store key in system keyring: {}", e))
}

fn try_read_from_keyring() -> Result<Option<String>, String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| format!("Failed to create keyring entry: {}", e))?;
    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(format!("Failed to read key from system keyring: {}", err)),
    }
}

fn try_delete_from_keyring() -> Result<(), String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| format!("Failed to create keyring entry: {}", e))?;
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(format!("Failed to delete key from system keyring: {}", err)),
    }
}

pub fn store_api_key(config_dir: &Path, api_key: &str) -> Result<(), String> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err("API key cannot be empty".to_string());
    }

    if let Err(err) = try_store_in_keyring(key) {
        warn!(
            "System keyring unavailable: {}. Falling back to file storage.",
            err
        );
        let mut store = load_file_store(config_dir)?;
        store.key = Some(key.to_string());
        return save_file_store(config_dir, &store);
    }

    // Key is in the keyring; make sure no stale file copy lingers.
    let mut store = load_file_store(config_dir)?;
    if store.key.take().is_some() {
        save_file_store(config_dir, &store)?;
    }
    Ok(())
}

pub fn read_api_key(config_dir: &Path) -> Result<Option<String>, String> {
    match try_read_from_keyring() {
        Ok(Some(key)) if !key.trim().is_empty() => return Ok(Some(key)),
        Ok(_) => {}
        Err(err) => {
            warn!(
                "System keyring read unavailable: {}. Falling back to file storage.",
                err
            );
        }
    }

    let store = load_file_store(config_dir)?;
    Ok(store.key.filter(|value| !value.trim().is_empty()))
}

pub fn clear_api_key(config_dir: &Path) -> Result<(), String> {
    if let Err(err) = try_delete_from_keyring() {
        warn!(
            "System keyring delete unavailable: {}. Cleaning file fallback.",
            err
        );
    }

    let mut store = load_file_store(config_dir)?;
    store.key = None;
    save_file_store(config_dir, &store)
}
