//! RSS Feed Client for article collection
//!
//! Fetches RSS/Atom feeds and returns their entry links in document order.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

use crate::error::NewsError;

const USER_AGENT: &str = "newsbot/0.1 (+https://github.com/newsbot)";

/// Source of article links for a feed URL
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Return entry links of one feed, in feed order
    async fn entry_links(&self, feed_url: &str) -> Result<Vec<String>, NewsError>;
}

/// RSS feed client
pub struct RssClient {
    client: Client,
}

impl RssClient {
    /// Create a new RSS client with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for RssClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for RssClient {
    #[instrument(skip(self))]
    async fn entry_links(&self, feed_url: &str) -> Result<Vec<String>, NewsError> {
        info!("Fetching RSS feed: {}", feed_url);

        let response = self.client.get(feed_url).send().await?;

        if !response.status().is_success() {
            return Err(NewsError::ApiError {
                status: response.status().as_u16(),
                message: format!("Failed to fetch {}", feed_url),
            });
        }

        let content = response.bytes().await?;
        let links = parse_feed_links(&content)?;

        info!("Found {} entries in {}", links.len(), feed_url);
        Ok(links)
    }
}

/// Parse a feed document as RSS first, then Atom, returning entry links
pub fn parse_feed_links(content: &[u8]) -> Result<Vec<String>, NewsError> {
    if let Ok(channel) = rss::Channel::read_from(content) {
        return Ok(channel
            .items()
            .iter()
            .filter_map(|item| item.link())
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
            .collect());
    }

    if let Ok(feed) = atom_syndication::Feed::read_from(content) {
        return Ok(feed
            .entries()
            .iter()
            .filter_map(|entry| {
                let links = entry.links();
                links
                    .iter()
                    .find(|l| l.rel() == "alternate")
                    .or_else(|| links.first())
                    .map(|l| l.href().trim().to_string())
            })
            .filter(|link| !link.is_empty())
            .collect());
    }

    Err(NewsError::ParseError(
        "Document is neither RSS nor Atom".to_string(),
    ))
}
