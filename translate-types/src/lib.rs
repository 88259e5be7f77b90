//! Shared types for the voice-translate pipeline.
//!
//! Pure data definitions consumed by the engine crate and any front end;
//! no I/O or platform code lives here.

use serde::{Deserialize, Serialize};

/// Active source→target language pairing, selected by the user.
///
/// Exactly two directions exist in this system: English→Mandarin and
/// Mandarin→English. Switching is only valid while no session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageDirection {
    EnToZh,
    ZhToEn,
}

/// Resolved language codes for one direction.
///
/// `recognition_tag` is the full locale tag the speech capability expects;
/// `source`/`target` are the codes translation providers consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguagePair {
    pub recognition_tag: &'static str,
    pub source: &'static str,
    pub target: &'static str,
}

impl LanguageDirection {
    /// Resolve this direction to its ordered (source, target) pair.
    pub fn pair(&self) -> LanguagePair {
        match self {
            LanguageDirection::EnToZh => LanguagePair {
                recognition_tag: "en-US",
                source: "en",
                target: "zh-CN",
            },
            LanguageDirection::ZhToEn => LanguagePair {
                recognition_tag: "zh-CN",
                source: "zh-CN",
                target: "en",
            },
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            LanguageDirection::EnToZh => LanguageDirection::ZhToEn,
            LanguageDirection::ZhToEn => LanguageDirection::EnToZh,
        }
    }

    /// Parse a direction string (format: "en-zh" or "zh-en").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en-zh" => Some(LanguageDirection::EnToZh),
            "zh-en" => Some(LanguageDirection::ZhToEn),
            _ => None,
        }
    }
}

impl std::fmt::Display for LanguageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageDirection::EnToZh => write!(f, "en-zh"),
            LanguageDirection::ZhToEn => write!(f, "zh-en"),
        }
    }
}

/// Identifier of a translation provider in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    MyMemory,
    LibreTranslate,
    GoogleWeb,
}

impl ProviderId {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mymemory" => Some(ProviderId::MyMemory),
            "libretranslate" => Some(ProviderId::LibreTranslate),
            "googleweb" => Some(ProviderId::GoogleWeb),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::MyMemory => write!(f, "mymemory"),
            ProviderId::LibreTranslate => write!(f, "libretranslate"),
            ProviderId::GoogleWeb => write!(f, "googleweb"),
        }
    }
}

/// Outcome of translating one finalized segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationStatus {
    Success,
    AllProvidersFailed,
}

/// Translation of one finalized segment: one provider's text on success,
/// or a terminal failure marker. Never a merge of multiple providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub status: TranslationStatus,
    pub text: Option<String>,
    pub provider: Option<ProviderId>,
}

impl TranslationResult {
    pub fn success(text: String, provider: Option<ProviderId>) -> Self {
        Self {
            status: TranslationStatus::Success,
            text: Some(text),
            provider,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: TranslationStatus::AllProvidersFailed,
            text: None,
            provider: None,
        }
    }
}

/// Why a recognition session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    UserStop,
    PlatformEnd,
    Error(String),
}

/// Lifecycle of one recognition session. `Ended` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Listening,
    Stopping,
    Ended(EndReason),
}

/// Events a recognition session emits toward the controller.
///
/// `Interim` carries the full current hypothesis and replaces the previous
/// interim text; `Final` carries a segment the recognizer will not revise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionEvent {
    Interim { text: String },
    Final { text: String },
    Error { detail: String },
    Ended,
}

/// Transcript bookkeeping for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptState {
    /// Everything recognized since the last finalize event.
    pub live: String,
    /// Concatenation of all finalized segments this session.
    pub committed: String,
}

impl TranscriptState {
    /// Replace the live hypothesis with a new interim guess.
    pub fn set_interim(&mut self, text: String) {
        self.live = text;
    }

    /// Commit a finalized segment. The interim text it supersedes is
    /// discarded, not appended.
    pub fn commit(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            if !self.committed.is_empty() {
                self.committed.push(' ');
            }
            self.committed.push_str(text);
        }
        self.live.clear();
    }

    pub fn reset(&mut self) {
        self.live.clear();
        self.committed.clear();
    }
}

/// Observable pipeline state, rendered by an external view layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedState {
    pub listening: bool,
    pub live: String,
    pub committed: String,
    pub translated: Option<TranslationResult>,
    pub last_error: Option<String>,
}
