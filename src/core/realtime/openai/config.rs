//! Session parameters for the AI leg of a phone call.
//!
//! Each enum maps a configured string onto a value the Realtime API
//! accepts. Unrecognised strings fall back to the phone-call default rather
//! than failing the call, since the provider would reject them anyway.

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

// =============================================================================
// Models
// =============================================================================

/// Realtime models that speak over a phone connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenAIRealtimeModel {
    Gpt4oRealtimePreview,
    /// Pinned snapshot, the default for call handling
    #[default]
    Gpt4oRealtimePreview20241001,
    Gpt4oRealtimePreview20241217,
    /// Lower latency, lower cost
    Gpt4oMiniRealtimePreview,
}

impl OpenAIRealtimeModel {
    const ALL: [Self; 4] = [
        Self::Gpt4oRealtimePreview,
        Self::Gpt4oRealtimePreview20241001,
        Self::Gpt4oRealtimePreview20241217,
        Self::Gpt4oMiniRealtimePreview,
    ];

    /// Value of the `model` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oRealtimePreview20241001 => "gpt-4o-realtime-preview-2024-10-01",
            Self::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        lookup(&Self::ALL, s, Self::as_str).unwrap_or_default()
    }
}

impl std::fmt::Display for OpenAIRealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Assistant voice heard by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenAIRealtimeVoice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl OpenAIRealtimeVoice {
    const ALL: [Self; 8] = [
        Self::Alloy,
        Self::Ash,
        Self::Ballad,
        Self::Coral,
        Self::Echo,
        Self::Sage,
        Self::Shimmer,
        Self::Verse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        lookup(&Self::ALL, s, Self::as_str).unwrap_or_default()
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio encoding on the AI leg.
///
/// Phone media streams carry 8kHz mu-law, so `g711_ulaw` lets frames pass
/// through both legs untouched. The other encodings only make sense for a
/// telephony leg configured to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenAIRealtimeAudioFormat {
    /// 24kHz 16-bit PCM
    Pcm16,
    #[default]
    G711Ulaw,
    G711Alaw,
}

impl OpenAIRealtimeAudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }

    /// Sample rate implied by the encoding (Hz).
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => 24000,
            Self::G711Ulaw | Self::G711Alaw => 8000,
        }
    }

    /// Accepts the API names plus the telephony spellings (`mulaw`,
    /// `audio/x-mulaw`).
    pub fn from_str_or_default(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        match s.strip_prefix("audio/x-").unwrap_or(&s) {
            "pcm16" | "pcm" | "linear16" => Self::Pcm16,
            "g711_alaw" | "alaw" => Self::G711Alaw,
            _ => Self::G711Ulaw,
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeAudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Response modalities. Calls enable both so transcripts are logged
/// alongside the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}

fn lookup<T: Copy>(all: &[T], s: &str, name: fn(&T) -> &'static str) -> Option<T> {
    let s = s.trim();
    all.iter().copied().find(|v| name(v).eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup() {
        assert_eq!(
            OpenAIRealtimeModel::from_str_or_default(" GPT-4O-MINI-REALTIME-PREVIEW "),
            OpenAIRealtimeModel::Gpt4oMiniRealtimePreview
        );
        assert_eq!(
            OpenAIRealtimeModel::from_str_or_default("gpt-5-voice"),
            OpenAIRealtimeModel::Gpt4oRealtimePreview20241001
        );
    }

    #[test]
    fn test_voice_lookup() {
        assert_eq!(
            OpenAIRealtimeVoice::from_str_or_default("Shimmer"),
            OpenAIRealtimeVoice::Shimmer
        );
        assert_eq!(
            OpenAIRealtimeVoice::from_str_or_default(""),
            OpenAIRealtimeVoice::Alloy
        );
    }

    #[test]
    fn test_audio_format_accepts_telephony_names() {
        for name in ["g711_ulaw", "mulaw", "audio/x-mulaw", "whatever"] {
            assert_eq!(
                OpenAIRealtimeAudioFormat::from_str_or_default(name),
                OpenAIRealtimeAudioFormat::G711Ulaw
            );
        }
        assert_eq!(
            OpenAIRealtimeAudioFormat::from_str_or_default("audio/x-alaw"),
            OpenAIRealtimeAudioFormat::G711Alaw
        );
        assert_eq!(
            OpenAIRealtimeAudioFormat::from_str_or_default("linear16"),
            OpenAIRealtimeAudioFormat::Pcm16
        );
        assert_eq!(OpenAIRealtimeAudioFormat::G711Ulaw.sample_rate(), 8000);
    }
}
