use anyhow::{Context, Result};
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 100.0;
pub const DEFAULT_CELEBRATION_THRESHOLD: u8 = 85;
pub const DEFAULT_HIGH_SCORE: u8 = 80;
pub const DEFAULT_DETAIL_LIMIT: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Client configuration loaded from environment variables.
/// Everything has a default; a variable that is set but unparseable is an error.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub swipe_threshold: f64,
    pub celebration_threshold: u8,
    pub high_score: u8,
    pub detail_limit: usize,
    pub placeholder: bool,
    pub timeout_secs: u64,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            celebration_threshold: DEFAULT_CELEBRATION_THRESHOLD,
            high_score: DEFAULT_HIGH_SCORE,
            detail_limit: DEFAULT_DETAIL_LIMIT,
            placeholder: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let swipe_threshold: f64 =
            parse_var(&lookup, "MATCHDECK_SWIPE_THRESHOLD")?.unwrap_or(defaults.swipe_threshold);
        if !swipe_threshold.is_finite() || swipe_threshold <= 0.0 {
            anyhow::bail!("MATCHDECK_SWIPE_THRESHOLD must be a positive number");
        }

        let celebration_threshold: u8 = parse_var(&lookup, "MATCHDECK_CELEBRATION_THRESHOLD")?
            .unwrap_or(defaults.celebration_threshold);
        let high_score: u8 =
            parse_var(&lookup, "MATCHDECK_HIGH_SCORE")?.unwrap_or(defaults.high_score);
        if celebration_threshold > 100 || high_score > 100 {
            anyhow::bail!("Score thresholds must be between 0 and 100");
        }

        let placeholder = match lookup("MATCHDECK_PLACEHOLDER").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => anyhow::bail!("MATCHDECK_PLACEHOLDER must be true/false, got '{other}'"),
        };

        Ok(Config {
            api_url: lookup("MATCHDECK_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            swipe_threshold,
            celebration_threshold,
            high_score,
            detail_limit: parse_var(&lookup, "MATCHDECK_DETAIL_LIMIT")?
                .unwrap_or(defaults.detail_limit),
            placeholder,
            timeout_secs: parse_var(&lookup, "MATCHDECK_TIMEOUT_SECS")?
                .unwrap_or(defaults.timeout_secs),
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.swipe_threshold, 100.0);
        assert_eq!(config.celebration_threshold, 85);
        assert_eq!(config.high_score, 80);
        assert_eq!(config.detail_limit, 6);
        assert!(!config.placeholder);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_with(&[
            ("MATCHDECK_API_URL", "https://match.example.com/"),
            ("MATCHDECK_SWIPE_THRESHOLD", "120"),
            ("MATCHDECK_CELEBRATION_THRESHOLD", "90"),
            ("MATCHDECK_PLACEHOLDER", "true"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://match.example.com");
        assert_eq!(config.swipe_threshold, 120.0);
        assert_eq!(config.celebration_threshold, 90);
        assert!(config.placeholder);
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = config_with(&[("MATCHDECK_DETAIL_LIMIT", "lots")]).unwrap_err();
        assert!(err.to_string().contains("MATCHDECK_DETAIL_LIMIT"));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        assert!(config_with(&[("MATCHDECK_SWIPE_THRESHOLD", "0")]).is_err());
        assert!(config_with(&[("MATCHDECK_SWIPE_THRESHOLD", "-5")]).is_err());
    }

    #[test]
    fn test_rejects_score_threshold_above_100() {
        assert!(config_with(&[("MATCHDECK_CELEBRATION_THRESHOLD", "101")]).is_err());
    }
}
