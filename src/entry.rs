use crate::constants::{LUCIDITY_MAX, MANUAL_TRANSCRIPTION, PENDING_TRANSCRIPTION};
use crate::util::{new_entry_id, now_ms};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Base64-encoded binary payload as embedded in the persisted journal.
/// The journal is one JSON document, so audio clips and illustrations travel
/// inside it rather than as separate files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub data: String,
    pub mime: String,
}

impl MediaPayload {
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        Self {
            data: BASE64.encode(bytes),
            mime: mime.to_string(),
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>, String> {
        BASE64
            .decode(&self.data)
            .map_err(|e| format!("Corrupt media payload: {}", e))
    }
}

/// One journal record: a recorded dream and everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamEntry {
    pub id: String,
    pub created_at_ms: u64,
    pub raw_audio: Option<MediaPayload>,
    pub transcription: String,
    pub tags: Vec<String>,
    pub mood: String,
    pub lucidity_score: u8,
    pub pending: bool,
    pub illustration: Option<MediaPayload>,
}

impl DreamEntry {
    /// Optimistic placeholder inserted the moment a recording finishes,
    /// before the analysis call resolves.
    pub fn recorded(audio: MediaPayload) -> Self {
        Self {
            id: new_entry_id(),
            created_at_ms: now_ms(),
            raw_audio: Some(audio),
            transcription: PENDING_TRANSCRIPTION.to_string(),
            tags: Vec::new(),
            mood: String::new(),
            lucidity_score: 0,
            pending: true,
            illustration: None,
        }
    }

    /// Entry created without a recording. An empty text gets the manual-entry
    /// sentinel so the list still has something to render.
    pub fn manual(transcription: &str) -> Self {
        let text = transcription.trim();
        Self {
            id: new_entry_id(),
            created_at_ms: now_ms(),
            raw_audio: None,
            transcription: if text.is_empty() {
                MANUAL_TRANSCRIPTION.to_string()
            } else {
                text.to_string()
            },
            tags: Vec::new(),
            mood: String::new(),
            lucidity_score: 0,
            pending: false,
            illustration: None,
        }
    }

    /// Duplicates are accepted; tags are a display list, not a set.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if !tag.is_empty() {
            self.tags.push(tag.to_string());
        }
    }

    /// Removing a tag that is not present is a no-op.
    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn apply(&mut self, patch: &EntryPatch) {
        if let Some(transcription) = &patch.transcription {
            self.transcription = transcription.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(mood) = &patch.mood {
            self.mood = mood.clone();
        }
        if let Some(score) = patch.lucidity_score {
            self.lucidity_score = score.min(LUCIDITY_MAX);
        }
        if let Some(pending) = patch.pending {
            self.pending = pending;
        }
        if let Some(illustration) = &patch.illustration {
            self.illustration = Some(illustration.clone());
        }
    }
}

/// Partial update keyed by entry id. Re-applying the same patch leaves the
/// entry unchanged, which makes duplicate analysis completions harmless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPatch {
    pub transcription: Option<String>,
    pub tags: Option<Vec<String>>,
    pub mood: Option<String>,
    pub lucidity_score: Option<u8>,
    pub pending: Option<bool>,
    pub illustration: Option<MediaPayload>,
}
