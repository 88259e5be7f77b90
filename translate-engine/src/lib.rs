//! Core transcription-to-translation pipeline.
//!
//! Wires a platform speech-recognition capability (injected behind
//! [`recognizer::RecognizerFactory`]) to an ordered chain of translation
//! providers with fallback. The [`controller::DictationController`] owns
//! all state and publishes a snapshot a view layer can render.

pub mod config;
pub mod controller;
pub mod gateway;
pub mod provider;
pub mod recognizer;
pub mod session;
pub mod stdin_recognizer;

pub use controller::{run_pipeline, ControllerCommand, DictationController};
pub use gateway::TranslationGateway;
