//! Ingested article data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article accepted by the ingestion pipeline
///
/// `text` always holds the chosen body: the primary extracted body, or the
/// fallback summary when the primary body was empty or too short.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Article URL (also the dedup cache key)
    pub url: String,
    /// Article title
    pub title: String,
    /// Chosen body text
    pub text: String,
    /// Secondary description/summary field from the page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_summary: Option<String>,
    /// Publication date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
}

impl Article {
    /// Build an article from extracted fields, applying body fallback precedence.
    ///
    /// The primary body is preferred; the fallback substitutes only when the
    /// primary is too short. Returns `None` unless the chosen body is strictly
    /// longer (in characters) than `min_body_length`.
    pub fn accept(
        url: impl Into<String>,
        title: impl Into<String>,
        text: Option<String>,
        fallback_summary: Option<String>,
        publish_date: Option<DateTime<Utc>>,
        min_body_length: usize,
    ) -> Option<Self> {
        let body = choose_body(
            text.as_deref(),
            fallback_summary.as_deref(),
            min_body_length,
        )?;

        Some(Self {
            url: url.into(),
            title: title.into(),
            text: body.to_string(),
            fallback_summary,
            publish_date,
        })
    }
}

fn choose_body<'a>(
    text: Option<&'a str>,
    fallback: Option<&'a str>,
    min_body_length: usize,
) -> Option<&'a str> {
    let long_enough = |body: &&str| body.trim().chars().count() > min_body_length;
    text.filter(long_enough).or_else(|| fallback.filter(long_enough))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_body_wins() {
        let article = Article::accept(
            "https://example.com/a",
            "Title",
            Some("x".repeat(80)),
            Some("y".repeat(80)),
            None,
            50,
        )
        .unwrap();
        assert_eq!(article.text, "x".repeat(80));
    }

    #[test]
    fn test_fallback_used_when_primary_empty() {
        let article = Article::accept(
            "https://example.com/a",
            "Title",
            Some("   ".to_string()),
            Some("y".repeat(60)),
            None,
            50,
        )
        .unwrap();
        assert_eq!(article.text, "y".repeat(60));
    }

    #[test]
    fn test_short_primary_falls_back() {
        let article = Article::accept(
            "https://example.com/a",
            "Title",
            Some("short".to_string()),
            Some("y".repeat(200)),
            None,
            50,
        )
        .unwrap();
        assert_eq!(article.text, "y".repeat(200));
    }

    #[test]
    fn test_both_short_rejected() {
        let article = Article::accept(
            "https://example.com/a",
            "Title",
            Some("short".to_string()),
            Some("also short".to_string()),
            None,
            50,
        );
        assert!(article.is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(Article::accept("u", "t", Some("x".repeat(50)), None, None, 50).is_none());
        assert!(Article::accept("u", "t", Some("x".repeat(51)), None, None, 50).is_some());
    }

    #[test]
    fn test_missing_body_rejected() {
        assert!(Article::accept("u", "t", None, None, None, 0).is_none());
    }
}
