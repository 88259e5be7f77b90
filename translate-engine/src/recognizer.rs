//! Platform speech-recognition capability boundary.
//!
//! The engine never reaches into ambient platform globals: a
//! [`RecognizerFactory`] is injected at startup and resolved once, so test
//! doubles and alternate backends plug in behind the same traits.

use anyhow::Result;
use tokio::sync::mpsc;

/// Settings handed to the platform recognizer when a session starts.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Full locale tag, e.g. "en-US" or "zh-CN".
    pub language_code: String,
    /// Keep listening across pauses until explicitly stopped.
    pub continuous: bool,
    /// Surface partial hypotheses before finalization.
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl RecognizerConfig {
    /// Configuration for live dictation. Continuous mode and interim
    /// results are both required: the live display depends on interim
    /// events and the dictation loop depends on not auto-stopping after a
    /// single utterance.
    pub fn continuous_dictation(language_code: &str, max_alternatives: u32) -> Self {
        Self {
            language_code: language_code.to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives,
        }
    }
}

/// One slot in the recognizer's growing result list.
///
/// Only `alternatives[0]` is consumed; an empty alternative list is a
/// malformed payload and is mapped to a recognition error at the boundary.
#[derive(Debug, Clone)]
pub struct ResultSlot {
    pub is_final: bool,
    pub alternatives: Vec<String>,
}

impl ResultSlot {
    pub fn interim(text: &str) -> Self {
        Self {
            is_final: false,
            alternatives: vec![text.to_string()],
        }
    }

    pub fn finalized(text: &str) -> Self {
        Self {
            is_final: true,
            alternatives: vec![text.to_string()],
        }
    }
}

/// Snapshot of the recognizer's result list for one callback invocation.
#[derive(Debug, Clone)]
pub struct RecognitionUpdate {
    pub slots: Vec<ResultSlot>,
    /// Index of the first slot that changed since the previous callback.
    pub result_index: usize,
}

/// Raw signals delivered by a recognizer backend, parsed into typed events
/// by the session before anything else sees them.
#[derive(Debug, Clone)]
pub enum RecognizerSignal {
    Result(RecognitionUpdate),
    Error(String),
    End,
}

/// One activation of the platform recognizer.
///
/// Implementations deliver their signals over the channel returned from
/// [`RecognizerFactory::create`]; `start`/`stop` only drive the underlying
/// capture resource.
pub trait SpeechRecognizer: Send {
    fn start(&mut self) -> Result<()>;

    /// Request graceful termination. Buffered results may still arrive
    /// before the backend emits [`RecognizerSignal::End`].
    fn stop(&mut self);
}

/// A recognizer plus the receiving half of its signal stream.
pub struct RecognizerHandle {
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub signals: mpsc::UnboundedReceiver<RecognizerSignal>,
}

/// Factory for recognizer activations, resolved once at startup.
///
/// `is_available` is the platform-support probe: callers must check it
/// before constructing a session so an unsupported platform is reported
/// without ever creating a recognizer.
pub trait RecognizerFactory: Send + Sync {
    fn is_available(&self) -> bool;

    fn create(&self, config: &RecognizerConfig) -> Result<RecognizerHandle>;
}
