//! One activation of the speech recognizer.
//!
//! A session owns its lifecycle (`Idle → Listening → Stopping → Ended`),
//! merges the recognizer's raw result slots into interim/final events, and
//! is terminal once ended; a fresh session must be created to listen again.

use tokio::sync::mpsc;
use tracing::{debug, warn};
use translate_types::{EndReason, RecognitionEvent, SessionState};

use crate::recognizer::{
    RecognitionUpdate, RecognizerConfig, RecognizerFactory, RecognizerSignal, SpeechRecognizer,
};

/// Failure to start a recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// No speech-recognition capability is present.
    UnsupportedPlatform,
    /// The session already ended; a new one must be created.
    SessionEnded,
    /// The backend refused to start.
    Recognizer(String),
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::UnsupportedPlatform => write!(f, "PlatformUnsupported"),
            StartError::SessionEnded => write!(f, "session already ended"),
            StartError::Recognizer(detail) => write!(f, "recognizer error: {}", detail),
        }
    }
}

impl std::error::Error for StartError {}

pub struct RecognitionSession {
    state: SessionState,
    recognizer: Box<dyn SpeechRecognizer>,
    /// Result slots already emitted as part of a `Final` event.
    finalized_slots: usize,
}

impl RecognitionSession {
    /// Construct a session from the injected capability.
    ///
    /// Fails with `UnsupportedPlatform` before any recognizer object is
    /// created when the capability is absent. Returns the session together
    /// with the receiving half of the backend's signal stream.
    pub fn new(
        factory: &dyn RecognizerFactory,
        config: &RecognizerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RecognizerSignal>), StartError> {
        if !factory.is_available() {
            return Err(StartError::UnsupportedPlatform);
        }

        let handle = factory
            .create(config)
            .map_err(|e| StartError::Recognizer(e.to_string()))?;

        let session = Self {
            state: SessionState::Idle,
            recognizer: handle.recognizer,
            finalized_slots: 0,
        };
        Ok((session, handle.signals))
    }

    /// Begin listening. Rejected once the session has ended.
    pub fn start(&mut self) -> Result<(), StartError> {
        match self.state {
            SessionState::Idle => {
                self.recognizer
                    .start()
                    .map_err(|e| StartError::Recognizer(e.to_string()))?;
                self.state = SessionState::Listening;
                Ok(())
            }
            SessionState::Ended(_) => Err(StartError::SessionEnded),
            _ => Ok(()),
        }
    }

    /// Request graceful termination. Buffered finals arriving before the
    /// backend's end signal are still emitted.
    pub fn request_stop(&mut self) {
        if matches!(self.state, SessionState::Listening) {
            self.recognizer.stop();
            self.state = SessionState::Stopping;
        }
    }

    /// Stop the underlying capture resource unconditionally. Used when the
    /// controller releases a session on error so no orphaned capture
    /// remains active.
    pub fn shutdown(&mut self) {
        self.recognizer.stop();
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, SessionState::Ended(_))
    }

    /// Translate one raw backend signal into session events.
    pub fn on_signal(&mut self, signal: RecognizerSignal) -> Vec<RecognitionEvent> {
        match signal {
            RecognizerSignal::Result(update) => self.on_update(update),
            RecognizerSignal::Error(detail) => {
                warn!("recognizer error: {}", detail);
                self.state = SessionState::Ended(EndReason::Error(detail.clone()));
                vec![RecognitionEvent::Error { detail }]
            }
            RecognizerSignal::End => {
                if self.is_ended() {
                    // Error path was already terminal; surface the end once.
                    return vec![RecognitionEvent::Ended];
                }
                let reason = if matches!(self.state, SessionState::Stopping) {
                    EndReason::UserStop
                } else {
                    EndReason::PlatformEnd
                };
                self.state = SessionState::Ended(reason);
                vec![RecognitionEvent::Ended]
            }
        }
    }

    /// Merge one callback's result slots into events.
    ///
    /// All slots newly finalized in this callback concatenate into a single
    /// `Final` event; all non-final slots concatenate into a single
    /// `Interim` event carrying the full current hypothesis (replacing, not
    /// appending to, the previous one).
    fn on_update(&mut self, update: RecognitionUpdate) -> Vec<RecognitionEvent> {
        if self.is_ended() {
            return Vec::new();
        }
        if matches!(self.state, SessionState::Idle) {
            warn!("recognizer result before session start, ignoring");
            return Vec::new();
        }

        debug!(
            "recognition update: {} slots, first changed {}",
            update.slots.len(),
            update.result_index
        );

        let mut final_parts: Vec<&str> = Vec::new();
        let mut interim = String::new();
        let mut final_count = 0usize;

        for (idx, slot) in update.slots.iter().enumerate() {
            let Some(text) = slot.alternatives.first() else {
                let detail = format!("result slot {} carried no alternatives", idx);
                self.state = SessionState::Ended(EndReason::Error(detail.clone()));
                return vec![RecognitionEvent::Error { detail }];
            };

            if slot.is_final {
                final_count += 1;
                if idx >= self.finalized_slots {
                    final_parts.push(text.trim());
                }
            } else {
                interim.push_str(text);
            }
        }

        self.finalized_slots = self.finalized_slots.max(final_count);

        let mut events = Vec::new();
        if !final_parts.is_empty() {
            let text = final_parts.join(" ").trim().to_string();
            events.push(RecognitionEvent::Final { text });
        }
        if !interim.is_empty() {
            events.push(RecognitionEvent::Interim {
                text: interim.trim().to_string(),
            });
        }
        events
    }
}
