use super::error::AnalysisError;
use super::models::{parse_analysis_text, DreamAnalysis};
use crate::constants::{
    ANALYSIS_CONNECT_TIMEOUT_SECS, ANALYSIS_READ_TIMEOUT_SECS, INTERPRETATION_FAILED,
};
use crate::entry::DreamEntry;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::time::Duration;
use tracing::warn;

// Prompt templates for the hosted generative model.
pub const ANALYZE_PROMPT: &str = "You are a dream journal assistant. Listen to this dream \
recording and answer with a strict JSON object holding exactly these fields: transcription \
(string, the spoken words), tags (array of 1-5 short theme labels), mood (one or two words), \
lucidity_score (integer 0-10, how lucid the dreamer sounds). Answer with only the JSON object.";

pub const ILLUSTRATE_PROMPT: &str = "Create a single dreamlike illustration of the following \
dream. Soft, surreal, painterly, no text in the image.";

pub const INTERPRET_PROMPT: &str = "You are a thoughtful dream interpreter. Given the dream \
journal entries below, write a short psychological reading that connects their recurring \
themes and imagery. Speak directly to the dreamer, in a calm voice, in at most three \
paragraphs.";

/// The three operations the journal core depends on. The hosted client
/// implements them over HTTP; tests substitute their own backends.
pub trait AnalysisBackend: Send + Sync {
    fn analyze(&self, audio: &[u8], mime: &str) -> Result<DreamAnalysis, AnalysisError>;
    fn illustrate(&self, transcription: &str, mood: &str) -> Result<Vec<u8>, AnalysisError>;
    fn interpret(&self, entries: &[DreamEntry]) -> Result<String, AnalysisError>;
}

/// Client for a hosted generative AI service speaking the generateContent
/// wire shape (text and inline media parts in, candidate parts out).
pub struct HostedAnalysisClient {
    endpoint: String,
    model: String,
    image_model: String,
    api_key: String,
}

impl HostedAnalysisClient {
    pub fn new(endpoint: &str, model: &str, image_model: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            image_model: image_model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn generate(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, AnalysisError> {
        if self.api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        let url = format!("{}/v1beta/models/{}:generateContent", self.endpoint, model);

        let agent = ureq::builder()
            .timeout_connect(Duration::from_secs(ANALYSIS_CONNECT_TIMEOUT_SECS))
            .timeout_read(Duration::from_secs(ANALYSIS_READ_TIMEOUT_SECS))
            .build();

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", &self.api_key)
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => AnalysisError::Http(code),
                ureq::Error::Transport(t) => {
                    let msg = t.to_string();
                    if msg.contains("timed out") || msg.contains("timeout") {
                        AnalysisError::Timeout
                    } else {
                        AnalysisError::Transport(msg)
                    }
                }
            })?;

        resp.into_json()
            .map_err(|e| AnalysisError::BadResponse(format!("unparseable body: {}", e)))
    }
}

/// Concatenated text of all parts of the first candidate.
fn candidate_text(json: &serde_json::Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First inline image of the first candidate, decoded.
fn candidate_image(json: &serde_json::Value) -> Option<Vec<u8>> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    parts
        .iter()
        .filter_map(|p| p["inlineData"]["data"].as_str())
        .find_map(|data| BASE64.decode(data).ok())
}

fn interpretation_digest(entries: &[DreamEntry]) -> String {
    let mut digest = String::new();
    for entry in entries {
        digest.push_str("\n- ");
        if !entry.mood.is_empty() {
            digest.push_str(&format!("[{}, lucidity {}/10] ", entry.mood, entry.lucidity_score));
        }
        digest.push_str(&entry.transcription);
        if !entry.tags.is_empty() {
            digest.push_str(&format!(" (tags: {})", entry.tags.join(", ")));
        }
    }
    digest
}

impl AnalysisBackend for HostedAnalysisClient {
    fn analyze(&self, audio: &[u8], mime: &str) -> Result<DreamAnalysis, AnalysisError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": ANALYZE_PROMPT },
                    { "inlineData": { "mimeType": mime, "data": BASE64.encode(audio) } }
                ]
            }]
        });
        let json = self.generate(&self.model, body)?;
        let text = candidate_text(&json)
            .ok_or_else(|| AnalysisError::BadResponse("no text candidate".to_string()))?;
        parse_analysis_text(&text)
    }

    fn illustrate(&self, transcription: &str, mood: &str) -> Result<Vec<u8>, AnalysisError> {
        let prompt = if mood.trim().is_empty() {
            format!("{}\n\nDream: {}", ILLUSTRATE_PROMPT, transcription)
        } else {
            format!(
                "{}\n\nMood: {}\nDream: {}",
                ILLUSTRATE_PROMPT, mood, transcription
            )
        };
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
        });
        let json = self.generate(&self.image_model, body)?;
        candidate_image(&json)
            .ok_or_else(|| AnalysisError::BadResponse("no image in response".to_string()))
    }

    fn interpret(&self, entries: &[DreamEntry]) -> Result<String, AnalysisError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": format!("{}\n{}", INTERPRET_PROMPT, interpretation_digest(entries)) }]
            }]
        });
        let json = self.generate(&self.model, body)?;
        candidate_text(&json)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| AnalysisError::BadResponse("no text candidate".to_string()))
    }
}

// The contracts the rest of the app relies on live here: analysis never
// faults to its caller, illustration absence means "show a notice", and a
// failed interpretation is the fixed failure string.

pub fn analyze_or_fallback(backend: &dyn AnalysisBackend, audio: &[u8], mime: &str) -> DreamAnalysis {
    match backend.analyze(audio, mime) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("Dream analysis failed, using fallback values: {}", e);
            DreamAnalysis::failure_fallback()
        }
    }
}

pub fn illustrate_or_none(
    backend: &dyn AnalysisBackend,
    transcription: &str,
    mood: &str,
) -> Option<Vec<u8>> {
    match backend.illustrate(transcription, mood) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Illustration failed: {}", e);
            None
        }
    }
}

pub fn interpret_or_fallback(backend: &dyn AnalysisBackend, entries: &[DreamEntry]) -> String {
    match backend.interpret(entries) {
        Ok(text) => text,
        Err(e) => {
            warn!("Interpretation failed, using fallback text: {}", e);
            INTERPRETATION_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ANALYSIS_FAILED_MOOD, ANALYSIS_FAILED_TAG};

    struct FailingBackend;

    impl AnalysisBackend for FailingBackend {
        fn analyze(&self, _audio: &[u8], _mime: &str) -> Result<DreamAnalysis, AnalysisError> {
            Err(AnalysisError::Timeout)
        }

        fn illustrate(&self, _t: &str, _m: &str) -> Result<Vec<u8>, AnalysisError> {
            Err(AnalysisError::Http(500))
        }

        fn interpret(&self, _entries: &[DreamEntry]) -> Result<String, AnalysisError> {
            Err(AnalysisError::Transport("connection refused".to_string()))
        }
    }

    struct FixedBackend;

    impl AnalysisBackend for FixedBackend {
        fn analyze(&self, _audio: &[u8], _mime: &str) -> Result<DreamAnalysis, AnalysisError> {
            Ok(DreamAnalysis {
                transcription: "a quiet forest".to_string(),
                tags: vec!["forest".to_string()],
                mood: "Calm".to_string(),
                lucidity_score: 3,
            })
        }

        fn illustrate(&self, _t: &str, _m: &str) -> Result<Vec<u8>, AnalysisError> {
            Ok(vec![137, 80, 78, 71])
        }

        fn interpret(&self, entries: &[DreamEntry]) -> Result<String, AnalysisError> {
            Ok(format!("{} dreams, one thread", entries.len()))
        }
    }

    // --- fallback contracts ---

    #[test]
    fn failed_analysis_returns_the_fixed_fallback_never_an_error() {
        let analysis = analyze_or_fallback(&FailingBackend, b"audio", "audio/wav");
        assert_eq!(analysis.tags, vec![ANALYSIS_FAILED_TAG]);
        assert_eq!(analysis.mood, ANALYSIS_FAILED_MOOD);
        assert_eq!(analysis.lucidity_score, 0);
    }

    #[test]
    fn failed_illustration_is_absence() {
        assert!(illustrate_or_none(&FailingBackend, "t", "m").is_none());
    }

    #[test]
    fn failed_interpretation_is_the_fixed_string() {
        assert_eq!(
            interpret_or_fallback(&FailingBackend, &[]),
            INTERPRETATION_FAILED
        );
    }

    #[test]
    fn successful_backend_results_pass_through() {
        let analysis = analyze_or_fallback(&FixedBackend, b"audio", "audio/wav");
        assert_eq!(analysis.transcription, "a quiet forest");
        assert_eq!(illustrate_or_none(&FixedBackend, "t", "m").unwrap(), vec![137, 80, 78, 71]);
        assert_eq!(interpret_or_fallback(&FixedBackend, &[]), "0 dreams, one thread");
    }

    // --- response plumbing ---

    #[test]
    fn candidate_text_joins_parts_of_the_first_candidate() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "hello " }, { "text": "world" }
            ]}}]
        });
        assert_eq!(candidate_text(&json).unwrap(), "hello world");
    }

    #[test]
    fn candidate_text_is_none_for_empty_or_missing_parts() {
        assert!(candidate_text(&serde_json::json!({})).is_none());
        let blank = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        });
        assert!(candidate_text(&blank).is_none());
    }

    #[test]
    fn candidate_image_decodes_inline_data() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "here is your image" },
                { "inlineData": { "mimeType": "image/png", "data": BASE64.encode([1u8, 2, 3]) } }
            ]}}]
        });
        assert_eq!(candidate_image(&json).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_api_key_is_rejected_before_any_network_call() {
        let client = HostedAnalysisClient::new("https://example.invalid", "m", "im", "  ");
        assert!(matches!(
            client.interpret(&[]),
            Err(AnalysisError::MissingApiKey)
        ));
    }

    #[test]
    fn interpretation_digest_carries_mood_and_tags() {
        let mut entry = DreamEntry::manual("a hallway of doors");
        entry.mood = "Curious".to_string();
        entry.tags = vec!["doors".to_string(), "hallway".to_string()];
        let digest = interpretation_digest(&[entry]);
        assert!(digest.contains("a hallway of doors"));
        assert!(digest.contains("Curious"));
        assert!(digest.contains("doors, hallway"));
    }
}
