//! Line-oriented recognizer backend for environments without a native
//! speech capability.
//!
//! Each stdin line is delivered as one finalized result slot, so the full
//! pipeline (session merging, translation fallback, published state) can
//! be exercised from a terminal. Development and demo use only; it sits
//! behind the same traits as a real platform recognizer.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::recognizer::{
    RecognitionUpdate, RecognizerConfig, RecognizerFactory, RecognizerHandle, RecognizerSignal,
    ResultSlot, SpeechRecognizer,
};

pub struct StdinRecognizerFactory;

impl RecognizerFactory for StdinRecognizerFactory {
    fn is_available(&self) -> bool {
        true
    }

    fn create(&self, config: &RecognizerConfig) -> Result<RecognizerHandle> {
        debug!(
            "creating stdin recognizer (lang {}, continuous {})",
            config.language_code, config.continuous
        );
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(RecognizerHandle {
            recognizer: Box::new(StdinRecognizer {
                signals: tx,
                continuous: config.continuous,
                reader: None,
            }),
            signals: rx,
        })
    }
}

pub struct StdinRecognizer {
    signals: mpsc::UnboundedSender<RecognizerSignal>,
    continuous: bool,
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl SpeechRecognizer for StdinRecognizer {
    /// Spawn the stdin reader task. Must be called on a tokio runtime.
    fn start(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        let tx = self.signals.clone();
        let continuous = self.continuous;
        self.reader = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut slots: Vec<ResultSlot> = Vec::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        slots.push(ResultSlot::finalized(line));
                        let update = RecognitionUpdate {
                            result_index: slots.len() - 1,
                            slots: slots.clone(),
                        };
                        if tx.send(RecognizerSignal::Result(update)).is_err() {
                            break;
                        }
                        if !continuous {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(RecognizerSignal::Error(e.to_string()));
                        break;
                    }
                }
            }
            let _ = tx.send(RecognizerSignal::End);
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let _ = self.signals.send(RecognizerSignal::End);
    }
}
