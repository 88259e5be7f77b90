//! Multi-provider translation with ordered fallback.
//!
//! Providers are tried strictly in configured order; the first success wins
//! and no further provider is contacted. Every failure mode (timeout,
//! transport error, non-2xx status, malformed response) is absorbed here
//! and only advances the chain. The gateway never errors past its own
//! boundary: all outcomes are values.

use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::{debug, info, warn};
use translate_types::{LanguagePair, TranslationResult};

use crate::provider::{self, ProviderSpec};

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct TranslationGateway {
    client: reqwest::Client,
    providers: Vec<ProviderSpec>,
}

impl TranslationGateway {
    pub fn new(providers: Vec<ProviderSpec>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, providers })
    }

    /// Translate one finalized segment.
    ///
    /// Empty input (after trimming) succeeds immediately with empty text
    /// and no network call. Otherwise providers are attempted in priority
    /// order until one yields a translated-text field; if every provider
    /// fails the result is the terminal `AllProvidersFailed` marker for
    /// this segment only.
    pub async fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return TranslationResult::success(String::new(), None);
        }

        for spec in &self.providers {
            match self.attempt(spec, trimmed, pair).await {
                Ok(translated) => {
                    info!(
                        "translated {} chars via {} ({} -> {})",
                        trimmed.chars().count(),
                        spec.id,
                        pair.source,
                        pair.target
                    );
                    return TranslationResult::success(translated, Some(spec.id));
                }
                Err(e) => {
                    warn!("provider {} failed: {:#}", spec.id, e);
                }
            }
        }

        warn!(
            "all {} translation providers failed for segment",
            self.providers.len()
        );
        TranslationResult::failed()
    }

    /// One attempt against one provider. No retries: fallback to the next
    /// provider is the retry mechanism.
    async fn attempt(&self, spec: &ProviderSpec, text: &str, pair: &LanguagePair) -> Result<String> {
        debug!("trying provider {} at {}", spec.id, spec.endpoint);

        let response = provider::build_request(&self.client, spec, text, pair)
            .timeout(Duration::from_millis(spec.timeout_ms))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("unexpected status {}", status));
        }

        let body = response.text().await?;
        provider::parse_response(spec.response, &body)
            .ok_or_else(|| anyhow!("response missing translated text field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{RequestFormat, ResponseFormat};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use translate_types::{LanguageDirection, ProviderId, TranslationStatus};

    /// Serve a canned HTTP response on loopback, counting hits.
    async fn spawn_responder(
        status_line: &'static str,
        body: &'static str,
        hits: Arc<AtomicUsize>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}/", addr)
    }

    fn spec(id: ProviderId, endpoint: String, timeout_ms: u64) -> ProviderSpec {
        ProviderSpec {
            id,
            endpoint,
            request: RequestFormat::QueryLangPair,
            response: ResponseFormat::TranslatedText,
            timeout_ms,
        }
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_responder("200 OK", r#"{"translatedText": "x"}"#, hits.clone()).await;
        let gateway =
            TranslationGateway::new(vec![spec(ProviderId::MyMemory, endpoint, 2000)]).unwrap();

        let result = gateway
            .translate("   ", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.status, TranslationStatus::Success);
        assert_eq!(result.text.as_deref(), Some(""));
        assert_eq!(result.provider, None);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_returns_first_success_in_order() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));
        let third_hits = Arc::new(AtomicUsize::new(0));

        let first =
            spawn_responder("500 Internal Server Error", "{}", first_hits.clone()).await;
        let second = spawn_responder("200 OK", r#"{"error": "quota"}"#, second_hits.clone()).await;
        let third = spawn_responder("200 OK", r#"{"translatedText": "x"}"#, third_hits.clone()).await;

        let gateway = TranslationGateway::new(vec![
            spec(ProviderId::MyMemory, first, 2000),
            spec(ProviderId::LibreTranslate, second, 2000),
            spec(ProviderId::GoogleWeb, third, 2000),
        ])
        .unwrap();

        let result = gateway
            .translate("hello", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.status, TranslationStatus::Success);
        assert_eq!(result.text.as_deref(), Some("x"));
        assert_eq!(result.provider, Some(ProviderId::GoogleWeb));

        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(third_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_stops_the_chain() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let first = spawn_responder("200 OK", r#"{"translatedText": "早"}"#, first_hits.clone()).await;
        let second = spawn_responder("200 OK", r#"{"translatedText": "x"}"#, second_hits.clone()).await;

        let gateway = TranslationGateway::new(vec![
            spec(ProviderId::MyMemory, first, 2000),
            spec(ProviderId::LibreTranslate, second, 2000),
        ])
        .unwrap();

        let result = gateway
            .translate("morning", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.text.as_deref(), Some("早"));
        assert_eq!(result.provider, Some(ProviderId::MyMemory));
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failing_providers_attempted_exactly_once() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));
        let third_hits = Arc::new(AtomicUsize::new(0));

        let first = spawn_responder("500 Internal Server Error", "{}", first_hits.clone()).await;
        let second = spawn_responder("429 Too Many Requests", "{}", second_hits.clone()).await;
        let third = spawn_responder("200 OK", "not json at all", third_hits.clone()).await;

        let gateway = TranslationGateway::new(vec![
            spec(ProviderId::MyMemory, first, 2000),
            spec(ProviderId::LibreTranslate, second, 2000),
            spec(ProviderId::GoogleWeb, third, 2000),
        ])
        .unwrap();

        let result = gateway
            .translate("hello", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.status, TranslationStatus::AllProvidersFailed);
        assert_eq!(result.text, None);
        assert_eq!(result.provider, None);

        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(third_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_advances_to_next_provider() {
        // Accepts connections but never answers.
        let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_endpoint = format!("http://{}/", silent.local_addr().unwrap());
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = silent.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
            }
        });

        let hits = Arc::new(AtomicUsize::new(0));
        let fallback = spawn_responder("200 OK", r#"{"translatedText": "x"}"#, hits.clone()).await;

        let gateway = TranslationGateway::new(vec![
            spec(ProviderId::MyMemory, silent_endpoint, 200),
            spec(ProviderId::LibreTranslate, fallback, 2000),
        ])
        .unwrap();

        let result = gateway
            .translate("hello", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.status, TranslationStatus::Success);
        assert_eq!(result.provider, Some(ProviderId::LibreTranslate));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_translated_text_counts_as_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_responder("200 OK", r#"{"translatedText": ""}"#, hits.clone()).await;
        let gateway =
            TranslationGateway::new(vec![spec(ProviderId::MyMemory, endpoint, 2000)]).unwrap();

        let result = gateway
            .translate("???", &LanguageDirection::EnToZh.pair())
            .await;
        assert_eq!(result.status, TranslationStatus::Success);
        assert_eq!(result.text.as_deref(), Some(""));
        assert_eq!(result.provider, Some(ProviderId::MyMemory));
    }
}
