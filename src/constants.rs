pub const TARGET_SAMPLE_RATE: u32 = 16_000;

pub const LUCIDITY_MAX: u8 = 10;

/// Placeholder shown while the analysis call for a fresh recording is in flight.
pub const PENDING_TRANSCRIPTION: &str = "Transcribing your dream...";
/// Shown when no API key is configured and the user has to type the dream out.
pub const MANUAL_TRANSCRIPTION: &str = "Tap to describe your dream.";

// Fixed fallback values the analysis contract guarantees on failure.
pub const ANALYSIS_FAILED_TRANSCRIPTION: &str = "Transcription failed. Tap to edit.";
pub const ANALYSIS_FAILED_TAG: &str = "Error";
pub const ANALYSIS_FAILED_MOOD: &str = "Unknown";
pub const INTERPRETATION_FAILED: &str =
    "The dream oracle is silent right now. Try again in a moment.";

// The journal list has two distinct empty states: an empty journal and a
// search that matched nothing.
pub const EMPTY_STORE_MESSAGE: &str = "The void is silent. Record your first dream.";
pub const NO_RESULTS_MESSAGE: &str = "No dreams match your search.";

pub const ANALYSIS_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const ANALYSIS_READ_TIMEOUT_SECS: u64 = 60;

pub const INTERPRETATION_ENTRY_LIMIT_DEFAULT: u32 = 20;
pub const INTERPRETATION_ENTRY_LIMIT_MAX: u32 = 100;
