use super::error::AnalysisError;
use crate::constants::{
    ANALYSIS_FAILED_MOOD, ANALYSIS_FAILED_TAG, ANALYSIS_FAILED_TRANSCRIPTION, LUCIDITY_MAX,
};
use serde::{Deserialize, Serialize};

/// What one `analyze` call produces for a recorded dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreamAnalysis {
    pub transcription: String,
    pub tags: Vec<String>,
    pub mood: String,
    pub lucidity_score: u8,
}

impl Default for DreamAnalysis {
    fn default() -> Self {
        Self {
            transcription: String::new(),
            tags: Vec::new(),
            mood: String::new(),
            lucidity_score: 0,
        }
    }
}

impl DreamAnalysis {
    /// The fixed values the analysis contract hands back instead of a fault.
    pub fn failure_fallback() -> Self {
        Self {
            transcription: ANALYSIS_FAILED_TRANSCRIPTION.to_string(),
            tags: vec![ANALYSIS_FAILED_TAG.to_string()],
            mood: ANALYSIS_FAILED_MOOD.to_string(),
            lucidity_score: 0,
        }
    }

    pub fn normalize(&mut self) {
        self.lucidity_score = self.lucidity_score.min(LUCIDITY_MAX);
        self.tags.retain(|t| !t.trim().is_empty());
        self.transcription = self.transcription.trim().to_string();
    }
}

/// Models wrap JSON answers in markdown fences often enough that stripping
/// them is part of parsing.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_analysis_text(text: &str) -> Result<DreamAnalysis, AnalysisError> {
    let cleaned = strip_code_fence(text);
    let mut analysis: DreamAnalysis = serde_json::from_str(cleaned)
        .map_err(|e| AnalysisError::BadResponse(format!("not the expected JSON: {}", e)))?;
    analysis.normalize();
    if analysis.transcription.is_empty() {
        return Err(AnalysisError::BadResponse(
            "empty transcription in analysis".to_string(),
        ));
    }
    Ok(analysis)
}
