//! Top-level pipeline orchestrator.
//!
//! The controller is the sole owner of session identity and published
//! state. All mutation happens on one task: user commands, recognizer
//! signals, and translation completions funnel into a single serialized
//! event loop, so no two events are ever processed concurrently. The
//! translation call is the only suspension point and runs as a spawned
//! task tagged with the segment's sequence number.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use translate_types::{
    LanguageDirection, LanguagePair, PublishedState, RecognitionEvent, SessionState,
    TranscriptState, TranslationResult,
};

use crate::gateway::TranslationGateway;
use crate::recognizer::{RecognizerConfig, RecognizerFactory, RecognizerSignal};
use crate::session::{RecognitionSession, StartError};

/// User-originated commands into the pipeline loop.
#[derive(Debug, Clone)]
pub enum ControllerCommand {
    Toggle,
    SetDirection(LanguageDirection),
    Shutdown,
}

/// A finalized segment queued for translation, tagged with its sequence
/// number so completions can be applied in segment order regardless of
/// network completion order.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub seq: u64,
    pub text: String,
    pub pair: LanguagePair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionError {
    SessionActive,
}

impl std::fmt::Display for DirectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectionError::SessionActive => {
                write!(f, "language direction is locked while a session is active")
            }
        }
    }
}

impl std::error::Error for DirectionError {}

pub struct DictationController {
    direction: LanguageDirection,
    factory: Arc<dyn RecognizerFactory>,
    gateway: Arc<TranslationGateway>,
    max_alternatives: u32,

    session: Option<RecognitionSession>,
    transcript: TranscriptState,
    listening: bool,
    translated: Option<TranslationResult>,
    last_error: Option<String>,

    /// Sequence number of the most recent finalized segment. Monotonic for
    /// the life of the controller, never reset across sessions.
    next_seq: u64,
    /// Sequence number of the translation currently displayed.
    displayed_seq: u64,

    shared: Arc<Mutex<PublishedState>>,
    updates_tx: mpsc::UnboundedSender<PublishedState>,
}

impl DictationController {
    pub fn new(
        factory: Arc<dyn RecognizerFactory>,
        gateway: Arc<TranslationGateway>,
        direction: LanguageDirection,
        max_alternatives: u32,
    ) -> (Self, mpsc::UnboundedReceiver<PublishedState>) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let controller = Self {
            direction,
            factory,
            gateway,
            max_alternatives,
            session: None,
            transcript: TranscriptState::default(),
            listening: false,
            translated: None,
            last_error: None,
            next_seq: 0,
            displayed_seq: 0,
            shared: Arc::new(Mutex::new(PublishedState::default())),
            updates_tx,
        };
        (controller, updates_rx)
    }

    pub fn direction(&self) -> LanguageDirection {
        self.direction
    }

    pub fn gateway(&self) -> Arc<TranslationGateway> {
        Arc::clone(&self.gateway)
    }

    /// Shared handle to the latest published state.
    pub fn shared_state(&self) -> Arc<Mutex<PublishedState>> {
        Arc::clone(&self.shared)
    }

    pub fn snapshot(&self) -> PublishedState {
        self.shared
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Start listening if idle, request a graceful stop if listening.
    ///
    /// Returns the new session's signal stream when one was started; the
    /// caller pumps it back through [`DictationController::handle_signal`].
    pub fn toggle(&mut self) -> Option<mpsc::UnboundedReceiver<RecognizerSignal>> {
        if let Some(session) = self.session.as_mut() {
            match session.state() {
                SessionState::Listening => {
                    info!("stop requested");
                    session.request_stop();
                }
                state => {
                    debug!("toggle ignored, session is {:?}", state);
                }
            }
            return None;
        }

        let pair = self.direction.pair();
        let config =
            RecognizerConfig::continuous_dictation(pair.recognition_tag, self.max_alternatives);

        let (mut session, signals) = match RecognitionSession::new(self.factory.as_ref(), &config)
        {
            Ok(created) => created,
            Err(e) => {
                if e == StartError::UnsupportedPlatform {
                    warn!("no speech-recognition capability present");
                }
                self.last_error = Some(e.to_string());
                self.publish();
                return None;
            }
        };

        if let Err(e) = session.start() {
            self.last_error = Some(e.to_string());
            self.publish();
            return None;
        }

        info!("listening ({} -> {})", pair.source, pair.target);
        self.transcript.reset();
        self.last_error = None;
        self.listening = true;
        self.session = Some(session);
        self.publish();
        Some(signals)
    }

    /// Change the language direction. Rejected while a session is active.
    pub fn set_direction(&mut self, direction: LanguageDirection) -> Result<(), DirectionError> {
        if self.session.is_some() {
            return Err(DirectionError::SessionActive);
        }
        if self.direction != direction {
            info!("direction set to {}", direction);
            self.direction = direction;
        }
        Ok(())
    }

    /// Feed one raw recognizer signal through the active session.
    ///
    /// Returns the translation jobs dispatched by any finalized segments;
    /// the caller runs them through the gateway and reports completions via
    /// [`DictationController::apply_translation`].
    pub fn handle_signal(&mut self, signal: RecognizerSignal) -> Vec<TranslationJob> {
        let events = match self.session.as_mut() {
            Some(session) => session.on_signal(signal),
            None => {
                debug!("recognizer signal after session release, ignoring");
                return Vec::new();
            }
        };

        let mut jobs = Vec::new();
        for event in events {
            if let Some(job) = self.apply_event(event) {
                jobs.push(job);
            }
        }
        jobs
    }

    fn apply_event(&mut self, event: RecognitionEvent) -> Option<TranslationJob> {
        match event {
            RecognitionEvent::Interim { text } => {
                self.transcript.set_interim(text);
                self.publish();
                None
            }
            RecognitionEvent::Final { text } => {
                self.transcript.commit(&text);
                self.publish();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                self.next_seq += 1;
                Some(TranslationJob {
                    seq: self.next_seq,
                    text: trimmed.to_string(),
                    pair: self.direction.pair(),
                })
            }
            RecognitionEvent::Error { detail } => {
                self.last_error = Some(detail);
                self.release_session();
                self.publish();
                None
            }
            RecognitionEvent::Ended => {
                info!("session ended");
                self.release_session();
                self.publish();
                None
            }
        }
    }

    /// Apply a completed translation unless a newer segment's result is
    /// already displayed. An older segment's slow response never clobbers a
    /// newer one; a stale result arriving when nothing newer is pending is
    /// still allowed to display.
    pub fn apply_translation(&mut self, seq: u64, result: TranslationResult) {
        if seq < self.displayed_seq {
            debug!(
                "discarding stale translation for segment {} (displaying {})",
                seq, self.displayed_seq
            );
            return;
        }
        self.displayed_seq = seq;
        self.translated = Some(result);
        self.publish();
    }

    /// Drop the active session and make sure its capture resource is
    /// stopped, so no orphaned microphone capture outlives the session.
    fn release_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
        }
        self.listening = false;
    }

    fn publish(&mut self) {
        let snapshot = PublishedState {
            listening: self.listening,
            live: self.transcript.live.clone(),
            committed: self.transcript.committed.clone(),
            translated: self.translated.clone(),
            last_error: self.last_error.clone(),
        };
        if let Ok(mut shared) = self.shared.lock() {
            *shared = snapshot.clone();
        }
        let _ = self.updates_tx.send(snapshot);
    }
}

async fn next_signal(
    signals: &mut Option<mpsc::UnboundedReceiver<RecognizerSignal>>,
) -> Option<RecognizerSignal> {
    match signals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Drive the controller until the command channel closes or `Shutdown`
/// arrives. All state mutation stays on this task; gateway calls run as
/// spawned tasks and report back through an internal completion channel.
///
/// Shutdown is graceful with respect to translations: a stop never cancels
/// an in-flight request for an already-finalized segment, so the loop
/// drains pending completions (each bounded by its provider timeouts)
/// before returning.
pub async fn run_pipeline(
    mut controller: DictationController,
    mut commands: mpsc::UnboundedReceiver<ControllerCommand>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, TranslationResult)>();
    let mut signals: Option<mpsc::UnboundedReceiver<RecognizerSignal>> = None;
    let mut pending: u64 = 0;
    let mut shutdown = false;

    loop {
        if shutdown && pending == 0 {
            break;
        }

        tokio::select! {
            command = commands.recv(), if !shutdown => {
                match command {
                    None | Some(ControllerCommand::Shutdown) => {
                        shutdown = true;
                    }
                    Some(ControllerCommand::Toggle) => {
                        if let Some(rx) = controller.toggle() {
                            signals = Some(rx);
                        }
                    }
                    Some(ControllerCommand::SetDirection(direction)) => {
                        if let Err(e) = controller.set_direction(direction) {
                            warn!("{}", e);
                        }
                    }
                }
            }
            signal = next_signal(&mut signals) => {
                let (signal, closed) = match signal {
                    Some(signal) => (signal, false),
                    // Backend dropped its sender without an explicit end.
                    None => (RecognizerSignal::End, true),
                };
                for job in controller.handle_signal(signal) {
                    let gateway = controller.gateway();
                    let done = done_tx.clone();
                    pending += 1;
                    tokio::spawn(async move {
                        let result = gateway.translate(&job.text, &job.pair).await;
                        let _ = done.send((job.seq, result));
                    });
                }
                if closed || !controller.has_session() {
                    signals = None;
                }
            }
            Some((seq, result)) = done_rx.recv(), if pending > 0 => {
                pending -= 1;
                controller.apply_translation(seq, result);
            }
        }
    }
}
