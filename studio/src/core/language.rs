use serde::{Deserialize, Serialize};

use crate::core::podcast::Speaker;

pub const DEFAULT_LANGUAGE: &str = "en-IN";

const LANGUAGE_NAMES: [(&str, &str); 11] = [
    ("hi-IN", "Hindi"),
    ("en-IN", "English"),
    ("ta-IN", "Tamil"),
    ("te-IN", "Telugu"),
    ("bn-IN", "Bengali"),
    ("gu-IN", "Gujarati"),
    ("mr-IN", "Marathi"),
    ("ml-IN", "Malayalam"),
    ("kn-IN", "Kannada"),
    ("pa-IN", "Punjabi"),
    ("od-IN", "Odia"),
];

// (language, host voice, guest voice)
const VOICES: [(&str, &str, &str); 11] = [
    ("hi-IN", "anushka", "karun"),
    ("en-IN", "anushka", "karun"),
    ("ta-IN", "anushka", "karun"),
    ("te-IN", "anushka", "karun"),
    ("bn-IN", "anushka", "karun"),
    ("gu-IN", "anushka", "karun"),
    ("mr-IN", "anushka", "karun"),
    ("ml-IN", "anushka", "karun"),
    ("kn-IN", "anushka", "karun"),
    ("pa-IN", "anushka", "karun"),
    ("od-IN", "anushka", "karun"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePair {
    pub host: String,
    pub guest: String,
}

impl VoicePair {
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host => &self.host,
            Speaker::Guest => &self.guest,
        }
    }
}

/// Human readable name used inside prompts. Unknown codes read as English.
pub fn language_name(code: &str) -> &'static str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("English")
}

pub fn is_supported(code: &str) -> bool {
    LANGUAGE_NAMES.iter().any(|(c, _)| *c == code)
}

/// Voice table entry for `code`, falling back to the English (India) voices.
pub fn voices_for(code: &str) -> VoicePair {
    let (_, host, guest) = VOICES
        .iter()
        .find(|(c, _, _)| *c == code)
        .or_else(|| VOICES.iter().find(|(c, _, _)| *c == DEFAULT_LANGUAGE))
        .copied()
        .unwrap_or(("", "anushka", "karun"));
    VoicePair {
        host: host.to_string(),
        guest: guest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_to_names() {
        assert_eq!(language_name("ta-IN"), "Tamil");
        assert_eq!(language_name("od-IN"), "Odia");
        assert!(is_supported("bn-IN"));
    }

    #[test]
    fn unknown_codes_fall_back_to_english() {
        assert_eq!(language_name("fr-FR"), "English");
        assert!(!is_supported("fr-FR"));
        assert_eq!(voices_for("fr-FR"), voices_for(DEFAULT_LANGUAGE));
    }

    #[test]
    fn voice_pair_picks_by_speaker() {
        let voices = voices_for("hi-IN");
        assert_eq!(voices.voice_for(Speaker::Host), "anushka");
        assert_eq!(voices.voice_for(Speaker::Guest), "karun");
    }
}
