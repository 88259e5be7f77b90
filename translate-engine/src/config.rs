use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;
use translate_types::{LanguageDirection, ProviderId};

use crate::provider::{ProviderSpec, RequestFormat, ResponseFormat};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default)]
    pub recognizer: RecognizerSection,
    #[serde(default)]
    pub translation: TranslationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerSection {
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSection {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Fallback chain, highest priority first. Empty means the built-in
    /// default chain.
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

/// One configured provider. Everything except `id` is optional and falls
/// back to the provider's built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request: Option<RequestFormat>,
    #[serde(default)]
    pub response: Option<ResponseFormat>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_direction() -> String {
    "en-zh".to_string()
}

fn default_max_alternatives() -> u32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for RecognizerSection {
    fn default() -> Self {
        Self {
            max_alternatives: default_max_alternatives(),
        }
    }
}

impl Default for TranslationSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            providers: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            direction: default_direction(),
            recognizer: RecognizerSection::default(),
            translation: TranslationSection::default(),
        }
    }
}

impl Config {
    /// Parsed startup direction, defaulting with a warning on bad input.
    pub fn direction(&self) -> LanguageDirection {
        match LanguageDirection::parse(&self.direction) {
            Some(direction) => direction,
            None => {
                warn!(
                    "unknown direction '{}' in config, using en-zh",
                    self.direction
                );
                LanguageDirection::EnToZh
            }
        }
    }

    /// Resolve the configured provider chain. Unknown provider ids are
    /// skipped with a warning; an empty (or fully skipped) list resolves
    /// to the built-in default chain.
    pub fn provider_chain(&self) -> Vec<ProviderSpec> {
        let timeout_ms = self.translation.request_timeout_ms;
        let mut chain = Vec::new();

        for entry in &self.translation.providers {
            let Some(id) = ProviderId::parse(&entry.id) else {
                warn!("unknown translation provider '{}', skipping", entry.id);
                continue;
            };
            let mut spec = ProviderSpec::defaults_for(id, timeout_ms);
            if let Some(endpoint) = &entry.endpoint {
                spec.endpoint = endpoint.clone();
            }
            if let Some(request) = entry.request {
                spec.request = request;
            }
            if let Some(response) = entry.response {
                spec.response = response;
            }
            if let Some(timeout_ms) = entry.timeout_ms {
                spec.timeout_ms = timeout_ms;
            }
            chain.push(spec);
        }

        if chain.is_empty() {
            return ProviderSpec::default_chain(timeout_ms);
        }
        chain
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("voice-translate").join("config.toml"))
}

/// Load the user configuration, falling back to defaults on any missing or
/// unparsable file.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        warn!("no config directory available, using defaults");
        return Config::default();
    };

    let config_str = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(_) => {
            return Config::default();
        }
    };

    match toml::from_str::<Config>(&config_str) {
        Ok(config) => {
            tracing::info!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("failed to parse {}: {}, using defaults", path.display(), e);
            Config::default()
        }
    }
}

/// Serialize a config back to TOML for display.
pub fn to_toml_string(config: &Config) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.direction(), LanguageDirection::EnToZh);
        assert_eq!(config.recognizer.max_alternatives, 1);
        assert_eq!(config.translation.request_timeout_ms, 5000);

        let chain = config.provider_chain();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].id, ProviderId::MyMemory);
    }

    #[test]
    fn test_configured_chain_order_and_overrides() {
        let config: Config = toml::from_str(
            r#"
direction = "zh-en"

[translation]
request_timeout_ms = 2000

[[translation.providers]]
id = "googleweb"

[[translation.providers]]
id = "mymemory"
endpoint = "http://localhost:8080/get"
timeout_ms = 750
"#,
        )
        .unwrap();

        assert_eq!(config.direction(), LanguageDirection::ZhToEn);

        let chain = config.provider_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, ProviderId::GoogleWeb);
        assert_eq!(chain[0].timeout_ms, 2000);
        assert_eq!(chain[1].id, ProviderId::MyMemory);
        assert_eq!(chain[1].endpoint, "http://localhost:8080/get");
        assert_eq!(chain[1].timeout_ms, 750);
    }

    #[test]
    fn test_unknown_provider_skipped() {
        let config: Config = toml::from_str(
            r#"
[[translation.providers]]
id = "deepl"
"#,
        )
        .unwrap();

        // Nothing valid configured: the built-in chain applies.
        let chain = config.provider_chain();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_bad_direction_falls_back() {
        let config: Config = toml::from_str(r#"direction = "en-fr""#).unwrap();
        assert_eq!(config.direction(), LanguageDirection::EnToZh);
    }

    #[test]
    fn test_provider_formats_parse_kebab_case() {
        let config: Config = toml::from_str(
            r#"
[[translation.providers]]
id = "libretranslate"
request = "json-body"
response = "translated-text"
"#,
        )
        .unwrap();

        let chain = config.provider_chain();
        assert_eq!(chain[0].request, RequestFormat::JsonBody);
        assert_eq!(chain[0].response, ResponseFormat::TranslatedText);
    }
}
