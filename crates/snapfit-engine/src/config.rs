use std::time::Duration;

use crate::prompts::PromptContract;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_XIMILAR_ENDPOINT: &str = "https://api.ximilar.com/tagging/fashion/v2/detect_tags";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 30.0;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 500;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    pub max_output_tokens: u64,
    pub ximilar_api_key: Option<String>,
    pub ximilar_endpoint: String,
    pub request_timeout: Duration,
    pub identify_prompt: PromptContract,
    pub brand_prompt: PromptContract,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            ximilar_api_key: None,
            ximilar_endpoint: DEFAULT_XIMILAR_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
            identify_prompt: PromptContract::identify(),
            brand_prompt: PromptContract::brand_only(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                lookup(key)
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
            })
        };
        let defaults = Self::default();

        let request_timeout = first(&["SNAPFIT_REQUEST_TIMEOUT"])
            .and_then(|raw| raw.parse::<f64>().ok())
            .map(timeout_from_seconds)
            .unwrap_or(defaults.request_timeout);

        Self {
            openai_api_key: first(&["OPENAI_API_KEY", "OPENAI_API_KEY_BACKUP"]),
            openai_api_base: first(&["OPENAI_API_BASE", "OPENAI_BASE_URL"])
                .map(|raw| normalize_api_base(&raw))
                .unwrap_or(defaults.openai_api_base),
            openai_model: first(&["SNAPFIT_OPENAI_MODEL"]).unwrap_or(defaults.openai_model),
            ximilar_api_key: first(&["XIMILAR_API_KEY"]),
            ximilar_endpoint: first(&["XIMILAR_API_URL"]).unwrap_or(defaults.ximilar_endpoint),
            request_timeout,
            ..defaults
        }
    }
}

/// Clamps a user-supplied timeout to 1..=300 seconds.
pub fn timeout_from_seconds(seconds: f64) -> Duration {
    if !seconds.is_finite() {
        return Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S);
    }
    Duration::from_secs_f64(seconds.clamp(1.0, 300.0))
}

/// Strips trailing slashes and appends `/v1` to a bare host.
pub fn normalize_api_base(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/').to_string();
    if let Ok(parsed) = reqwest::Url::parse(&base) {
        if parsed.path().trim().is_empty() || parsed.path() == "/" {
            base = format!("{base}/v1");
        }
    }
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.ximilar_api_key, None);
        assert_eq!(config.openai_api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.identify_prompt.version, "identify-v3");
    }

    #[test]
    fn backup_key_and_base_url_aliases_are_honored() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "   "),
            ("OPENAI_API_KEY_BACKUP", "sk-backup"),
            ("OPENAI_BASE_URL", "http://127.0.0.1:8080/"),
            ("XIMILAR_API_KEY", "xim"),
            ("SNAPFIT_REQUEST_TIMEOUT", "900"),
        ]));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-backup"));
        assert_eq!(config.openai_api_base, "http://127.0.0.1:8080/v1");
        assert_eq!(config.ximilar_api_key.as_deref(), Some("xim"));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn api_base_keeps_explicit_path() {
        assert_eq!(
            normalize_api_base("https://proxy.example.com/openai/v1/"),
            "https://proxy.example.com/openai/v1"
        );
        assert_eq!(normalize_api_base("https://api.openai.com"), "https://api.openai.com/v1");
    }

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(timeout_from_seconds(0.1), Duration::from_secs(1));
        assert_eq!(timeout_from_seconds(f64::NAN), Duration::from_secs(30));
        assert_eq!(timeout_from_seconds(12.5), Duration::from_millis(12_500));
    }
}
