//! Translation provider specifications.
//!
//! This is the only place provider-specific knowledge lives: endpoints,
//! request encodings, and where each response buries its translated text.
//! The gateway drives these specs in configured order and knows nothing
//! about any concrete service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use translate_types::{LanguagePair, ProviderId};

/// How a provider's request is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestFormat {
    /// GET with `q` and a combined `langpair=source|target` parameter.
    QueryLangPair,
    /// POST with a JSON body `{ q, source, target, format: "text" }`.
    JsonBody,
    /// GET with separate `sl`/`tl`/`q` parameters.
    QuerySingle,
}

/// Where a provider's response carries the translated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// Top-level `translatedText` field.
    TranslatedText,
    /// Nested `responseData.translatedText` field.
    ResponseData,
    /// Nested array-of-arrays; segments at `[0][i][0]` concatenate.
    SegmentMatrix,
}

/// Static configuration for one provider in the fallback chain.
///
/// Order in the chain defines priority and is fixed at configuration time.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub endpoint: String,
    pub request: RequestFormat,
    pub response: ResponseFormat,
    pub timeout_ms: u64,
}

impl ProviderSpec {
    /// Built-in endpoint and wire formats for a known provider.
    pub fn defaults_for(id: ProviderId, timeout_ms: u64) -> Self {
        match id {
            ProviderId::MyMemory => Self {
                id,
                endpoint: "https://api.mymemory.translated.net/get".to_string(),
                request: RequestFormat::QueryLangPair,
                response: ResponseFormat::ResponseData,
                timeout_ms,
            },
            ProviderId::LibreTranslate => Self {
                id,
                endpoint: "https://libretranslate.de/translate".to_string(),
                request: RequestFormat::JsonBody,
                response: ResponseFormat::TranslatedText,
                timeout_ms,
            },
            ProviderId::GoogleWeb => Self {
                id,
                endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
                request: RequestFormat::QuerySingle,
                response: ResponseFormat::SegmentMatrix,
                timeout_ms,
            },
        }
    }

    /// The default fallback chain, highest priority first.
    pub fn default_chain(timeout_ms: u64) -> Vec<ProviderSpec> {
        vec![
            ProviderSpec::defaults_for(ProviderId::MyMemory, timeout_ms),
            ProviderSpec::defaults_for(ProviderId::LibreTranslate, timeout_ms),
            ProviderSpec::defaults_for(ProviderId::GoogleWeb, timeout_ms),
        ]
    }
}

/// Strip a region subtag ("zh-CN" → "zh") for providers that only accept
/// bare language codes.
fn short_code(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Build the provider-specific request for one segment.
pub fn build_request(
    client: &reqwest::Client,
    spec: &ProviderSpec,
    text: &str,
    pair: &LanguagePair,
) -> reqwest::RequestBuilder {
    match spec.request {
        RequestFormat::QueryLangPair => {
            let langpair = format!("{}|{}", pair.source, pair.target);
            client
                .get(&spec.endpoint)
                .query(&[("q", text), ("langpair", langpair.as_str())])
        }
        RequestFormat::JsonBody => client.post(&spec.endpoint).json(&serde_json::json!({
            "q": text,
            "source": short_code(pair.source),
            "target": short_code(pair.target),
            "format": "text",
        })),
        RequestFormat::QuerySingle => client.get(&spec.endpoint).query(&[
            ("client", "gtx"),
            ("sl", pair.source),
            ("tl", pair.target),
            ("dt", "t"),
            ("q", text),
        ]),
    }
}

/// Extract the translated text from a provider response body.
///
/// Returns `None` for any missing or malformed text field. A present but
/// empty string is a legitimate success; some providers echo back
/// untranslatable input unchanged or empty.
pub fn parse_response(format: ResponseFormat, body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match format {
        ResponseFormat::TranslatedText => value
            .get("translatedText")?
            .as_str()
            .map(|s| s.to_string()),
        ResponseFormat::ResponseData => value
            .get("responseData")?
            .get("translatedText")?
            .as_str()
            .map(|s| s.to_string()),
        ResponseFormat::SegmentMatrix => {
            let segments = value.get(0)?.as_array()?;
            let mut out = String::new();
            for segment in segments {
                if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
                    out.push_str(piece);
                }
            }
            Some(out)
        }
    }
}
