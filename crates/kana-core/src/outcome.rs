//! The canonical `{display, speak}` pair every handler and model call
//! reduces to. `display` is shown verbatim; `speak` goes to synthesis.

use serde::{Deserialize, Serialize};

/// Normalized result of a handler or model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Text shown to the user.
    pub display: String,
    /// Text passed to speech synthesis (abbreviations expanded, etc.).
    pub speak: String,
}

/// Shape the model is asked to emit inside its reply.
#[derive(Deserialize)]
struct EmbeddedOutcome {
    display: String,
    speak: String,
}

impl Outcome {
    /// Same text for display and speech.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        Self {
            display: s.clone(),
            speak: s,
        }
    }

    pub fn new(display: impl Into<String>, speak: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            speak: speak.into(),
        }
    }

    /// Normalize a raw model reply into an Outcome.
    ///
    /// The model is asked to emit a JSON object with `display` and `speak`
    /// fields, but may not. Greedy match from the first `{` to the last `}`;
    /// if that slice parses and has both fields, use it. Any failure falls
    /// back to the raw text untouched, for both fields. Never errors.
    pub fn from_model_reply(raw: &str) -> Self {
        if let Some(embedded) = extract_embedded(raw) {
            return Self {
                display: embedded.display,
                speak: embedded.speak,
            };
        }
        Self::text(raw)
    }
}

fn extract_embedded(raw: &str) -> Option<EmbeddedOutcome> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let slice = &raw[start..=end];
    if !slice.contains("\"display\"") || !slice.contains("\"speak\"") {
        return None;
    }
    serde_json::from_str(slice).ok()
}
