use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4-turbo";
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
/// Room for a full-resolution phone photo once base64-encoded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No OpenAI API key found. Set OPENAI_API_KEY in the environment or a .env file.")]
    MissingApiKey,
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: u32,
    pub max_body_bytes: usize,
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        // Url::join drops the last path segment unless it ends in '/'.
        let mut base = get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ConfigError::Invalid {
            name: "OPENAI_BASE_URL",
            reason: e.to_string(),
        })?;

        let max_tokens = match get("OCR_MAX_TOKENS") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "OCR_MAX_TOKENS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let max_body_bytes = match get("OCR_MAX_BODY_BYTES") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "OCR_MAX_BODY_BYTES",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let bind_addr = get("OCR_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "OCR_BIND_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            base_url,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            max_body_bytes,
            bind_addr,
            log_dir: get("OCR_LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.model, "gpt-4-turbo");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_dir, PathBuf::from("."));
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://127.0.0.1:4000/v1"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OCR_MAX_TOKENS", "800"),
            ("OCR_MAX_BODY_BYTES", "1048576"),
            ("OCR_BIND_ADDR", "127.0.0.1:9000"),
            ("OCR_LOG_DIR", "/tmp/ocr"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:4000/v1/");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/ocr"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OCR_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OCR_MAX_TOKENS", .. }));

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OPENAI_BASE_URL", .. }));
    }
}
