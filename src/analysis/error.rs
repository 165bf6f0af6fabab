use std::fmt;

#[derive(Debug, Clone)]
pub enum AnalysisError {
    MissingApiKey,
    Http(u16),
    Timeout,
    Transport(String),
    BadResponse(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingApiKey => {
                write!(f, "No API key configured for the analysis service")
            }
            AnalysisError::Http(code) => write!(f, "Analysis service returned HTTP {}", code),
            AnalysisError::Timeout => write!(f, "Analysis request timed out"),
            AnalysisError::Transport(message) => write!(f, "Network error: {}", message),
            AnalysisError::BadResponse(message) => {
                write!(f, "Unexpected analysis response: {}", message)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}
