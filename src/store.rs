use crate::entry::{DreamEntry, EntryPatch};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Storage seam for the journal: one JSON document in one named slot.
/// Swapping the backend (file, database, test double) never touches the
/// store logic.
pub trait EntryStorage {
    /// Returns the raw persisted document, or None when nothing was saved yet.
    fn load_raw(&self) -> Result<Option<String>, String>;
    fn save_raw(&self, raw: &str) -> Result<(), String>;
}

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl EntryStorage for FileStorage {
    fn load_raw(&self) -> Result<Option<String>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| format!("Failed to read journal: {}", e))
    }

    fn save_raw(&self, raw: &str) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create journal directory: {}", e))?;
        }
        fs::write(&self.path, raw).map_err(|e| format!("Failed to write journal: {}", e))
    }
}

/// Newest-first collection of dream entries, written through to the storage
/// backend on every mutation.
pub struct EntryStore<S: EntryStorage> {
    entries: Vec<DreamEntry>,
    storage: S,
}

impl<S: EntryStorage> EntryStore<S> {
    /// Unreadable or corrupt persisted data is treated as an empty journal,
    /// not a fatal error.
    pub fn load(storage: S) -> Self {
        let entries = match storage.load_raw() {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Persisted journal is unreadable, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not load journal, starting empty: {}", e);
                Vec::new()
            }
        };
        Self { entries, storage }
    }

    pub fn entries(&self) -> &[DreamEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&DreamEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Prepends the entry: the storage order is newest-first.
    pub fn insert(&mut self, entry: DreamEntry) -> Result<(), String> {
        self.entries.insert(0, entry);
        self.persist()
    }

    /// Merges the patch into the matching entry. An unknown id is a no-op
    /// (returns false), not an error: a late analysis completion for an
    /// entry that disappeared with a store clear must not fault.
    pub fn update_by_id(&mut self, id: &str, patch: &EntryPatch) -> Result<bool, String> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        entry.apply(patch);
        self.persist()?;
        Ok(true)
    }

    pub fn replace_all(&mut self, entries: Vec<DreamEntry>) -> Result<(), String> {
        self.entries = entries;
        self.persist()
    }

    /// The only way entries leave the journal.
    pub fn clear(&mut self) -> Result<(), String> {
        self.replace_all(Vec::new())
    }

    fn persist(&self) -> Result<(), String> {
        let raw = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| format!("Failed to serialize journal: {}", e))?;
        self.storage.save_raw(&raw)
    }
}
