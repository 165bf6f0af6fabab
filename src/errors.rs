use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-wide error types with categories for better error handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Microphone errors (device missing, permission denied, stream failed)
    AudioDevice(String),

    /// Analysis service errors (transcription, illustration, interpretation)
    Analysis(String),

    /// Journal/settings storage errors
    Storage(String),

    /// Network errors outside the analysis fallback contracts
    Network(String),

    /// Generic errors that don't fit other categories
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::AudioDevice(msg) => write!(f, "Audio Device Error: {}", msg),
            AppError::Analysis(msg) => write!(f, "Analysis Error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage Error: {}", msg),
            AppError::Network(msg) => write!(f, "Network Error: {}", msg),
            AppError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Returns a user-friendly title for the error
    pub fn title(&self) -> &str {
        match self {
            AppError::AudioDevice(_) => "Microphone Issue",
            AppError::Analysis(_) => "Analysis Failed",
            AppError::Storage(_) => "Storage Error",
            AppError::Network(_) => "Network Problem",
            AppError::Other(_) => "Error",
        }
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        match self {
            AppError::AudioDevice(msg)
            | AppError::Analysis(msg)
            | AppError::Storage(msg)
            | AppError::Network(msg)
            | AppError::Other(msg) => msg,
        }
    }
}

/// Convert from String to AppError::Other
impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::Other(error)
    }
}

/// Convert from &str to AppError::Other
impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::Other(error.to_string())
    }
}

/// Error event payload sent to the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: AppError,
    pub timestamp: u64,
    pub context: Option<String>,
}

impl ErrorEvent {
    pub fn new(error: AppError) -> Self {
        Self {
            error,
            timestamp: crate::util::now_ms(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::AudioDevice("Device not found".to_string());
        assert_eq!(err.to_string(), "Audio Device Error: Device not found");
    }

    #[test]
    fn test_error_title() {
        let err = AppError::Analysis("service unreachable".to_string());
        assert_eq!(err.title(), "Analysis Failed");
    }

    #[test]
    fn test_from_string() {
        let err: AppError = "test error".into();
        assert!(matches!(err, AppError::Other(_)));
    }

    #[test]
    fn test_error_event() {
        let event = ErrorEvent::new(AppError::Network("Connection failed".to_string()))
            .with_context("Requesting interpretation");

        assert!(event.timestamp > 0);
        assert_eq!(event.context.as_deref(), Some("Requesting interpretation"));
    }
}
