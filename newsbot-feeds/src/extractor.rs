//! Article content extraction
//!
//! Downloads an article page and pulls out its title, body text, a fallback
//! description and the publication date.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{redirect, Client};
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::error::NewsError;

/// Maximum redirects followed for a single article
const MAX_REDIRECTS: usize = 5;

/// Extracted article content
#[derive(Debug, Clone, Default)]
pub struct ArticleContent {
    /// Article title
    pub title: String,
    /// Primary body text
    pub text: String,
    /// Meta description, used when the body is too short
    pub fallback_text: Option<String>,
    /// Publication date
    pub publish_date: Option<DateTime<Utc>>,
}

/// Turns an article URL into its content
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ArticleContent, NewsError>;
}

/// HTTP + HTML extractor
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    /// Create a new extractor
    ///
    /// Redirects are only followed over HTTPS to the same host the URL was
    /// admitted for.
    pub fn new(timeout: Duration) -> Result<Self, NewsError> {
        let policy = redirect::Policy::custom(|attempt| {
            let same_host = attempt
                .previous()
                .first()
                .map(|first| first.host_str() == attempt.url().host_str())
                .unwrap_or(false);

            if attempt.previous().len() > MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt.url().scheme() != "https" || !same_host {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .timeout(timeout)
            .redirect(policy)
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .map_err(|e| NewsError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, url: &str) -> Result<ArticleContent, NewsError> {
        debug!("Extracting article: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(NewsError::ApiError {
                status: response.status().as_u16(),
                message: format!("Failed to fetch {}", url),
            });
        }

        let html = response.text().await?;
        let content = extract_from_html(&html);

        debug!(
            "Extracted {} body chars from {} (fallback: {})",
            content.text.len(),
            url,
            content.fallback_text.is_some()
        );
        Ok(content)
    }
}

/// Extract article fields from an HTML document
pub fn extract_from_html(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(&document, "title"))
        .unwrap_or_default();

    let fallback_text = meta_content(&document, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="og:description"]"#));

    let publish_date = meta_content(&document, r#"meta[property="article:published_time"]"#)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|d| d.with_timezone(&Utc));

    ArticleContent {
        title,
        text: extract_body(&document),
        fallback_text,
        publish_date,
    }
}

/// Paragraphs of the main content area, then of the whole page
fn extract_body(document: &Html) -> String {
    for selector in ["article p", "main p", "p"] {
        let paragraphs = select_texts(document, selector);
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }

    // No paragraphs at all: fall back to the main content container's text
    for selector in ["article", "main", "body"] {
        let blocks = select_texts(document, selector);
        if !blocks.is_empty() {
            return blocks.join("\n");
        }
    }

    String::new()
}

fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    select_texts(document, selector).into_iter().next()
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|content| !content.is_empty())
}

/// Collapse runs of whitespace into single spaces
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
