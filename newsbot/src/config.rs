//! Runtime configuration
//!
//! Read once from the process environment at startup. Library crates never
//! look at environment variables; everything they need flows from here.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_POINTS: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone)]
pub struct NewsbotConfig {
    pub rss_feeds: Vec<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub cache_duration_hours: u64,
    pub cache_path: PathBuf,
    pub allowlist_path: PathBuf,
    pub summary_concurrency: usize,
    pub summary_max_points: usize,
    /// `None` means no budget
    pub max_tokens_per_run: Option<usize>,
    /// `None` means no cap
    pub max_articles_per_run: Option<usize>,
    pub min_body_length: usize,
    pub summary_input_chars: usize,
    pub output_path: PathBuf,
    pub json_logs: bool,
}

impl fmt::Debug for NewsbotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsbotConfig")
            .field("rss_feeds", &self.rss_feeds)
            .field("openai_api_key", &"<redacted>")
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("cache_duration_hours", &self.cache_duration_hours)
            .field("cache_path", &self.cache_path)
            .field("allowlist_path", &self.allowlist_path)
            .field("summary_concurrency", &self.summary_concurrency)
            .field("summary_max_points", &self.summary_max_points)
            .field("max_tokens_per_run", &self.max_tokens_per_run)
            .field("max_articles_per_run", &self.max_articles_per_run)
            .field("min_body_length", &self.min_body_length)
            .field("summary_input_chars", &self.summary_input_chars)
            .field("output_path", &self.output_path)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl NewsbotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so parsing can be exercised without touching
    /// the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rss_feeds: Vec<String> = lookup("RSS_FEEDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|feed| !feed.is_empty())
            .map(str::to_string)
            .collect();
        if rss_feeds.is_empty() {
            return Err(ConfigError::Missing("RSS_FEEDS"));
        }

        let openai_api_key = non_empty(lookup("OPENAI_API_KEY"))
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let summary_concurrency =
            parse_or_default("SUMMARY_CONCURRENCY", lookup("SUMMARY_CONCURRENCY"), 5usize)?;
        if summary_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "SUMMARY_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }

        Ok(Self {
            rss_feeds,
            openai_api_key,
            openai_model: non_empty(lookup("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: non_empty(lookup("OPENAI_BASE_URL")),
            cache_duration_hours: parse_or_default(
                "CACHE_DURATION_HOURS",
                lookup("CACHE_DURATION_HOURS"),
                24,
            )?,
            cache_path: path_or_default(lookup("CACHE_PATH"), "cache.json"),
            allowlist_path: path_or_default(lookup("ALLOWLIST_PATH"), "config/allowlist.txt"),
            summary_concurrency,
            summary_max_points: parse_max_points(lookup("SUMMARY_MAX_POINTS")),
            max_tokens_per_run: parse_limit("MAX_TOKENS_PER_RUN", lookup("MAX_TOKENS_PER_RUN"))?,
            max_articles_per_run: parse_limit(
                "MAX_ARTICLES_PER_RUN",
                lookup("MAX_ARTICLES_PER_RUN"),
            )?,
            min_body_length: parse_or_default("MIN_BODY_LENGTH", lookup("MIN_BODY_LENGTH"), 50)?,
            summary_input_chars: parse_or_default(
                "SUMMARY_INPUT_CHARS",
                lookup("SUMMARY_INPUT_CHARS"),
                3000,
            )?,
            output_path: path_or_default(lookup("OUTPUT_PATH"), "out/summaries.json"),
            json_logs: parse_flag(lookup("JSON_LOGS")),
        })
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn path_or_default(raw: Option<String>, default: &str) -> PathBuf {
    PathBuf::from(non_empty(raw).unwrap_or_else(|| default.to_string()))
}

fn parse_or_default<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(raw) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            reason: "expected a non-negative integer",
        }),
    }
}

/// Optional per-run ceiling: unset, empty or `0` disables it
pub fn parse_limit(key: &'static str, raw: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(value) = non_empty(raw) else {
        return Ok(None);
    };

    match value.parse::<i64>() {
        Ok(0) => Ok(None),
        Ok(n) if n < 0 => Err(ConfigError::Invalid {
            key,
            value,
            reason: "must not be negative",
        }),
        Ok(n) => usize::try_from(n).map(Some).map_err(|_| ConfigError::Invalid {
            key,
            value,
            reason: "out of range",
        }),
        Err(_) => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected an integer",
        }),
    }
}

/// Lenient: anything but a positive integer means the default
pub fn parse_max_points(raw: Option<String>) -> usize {
    non_empty(raw)
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(DEFAULT_MAX_POINTS)
}

pub fn parse_flag(raw: Option<String>) -> bool {
    non_empty(raw)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
