//! Ingestion pipeline
//!
//! Turns feed URLs into admitted, extracted, deduplicated articles. Runs
//! serially; the only shared state is the dedup cache, which is owned by the
//! caller and mutated in place.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use newsbot_core::Article;
use newsbot_feeds::{
    Allowlist, ArticleContent, ContentExtractor, FeedSource, NewsError, UrlValidator,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::dedup_cache::DedupCache;
use crate::retry::RetryPolicy;

/// Default minimum body length (exclusive)
pub const DEFAULT_MIN_BODY_LENGTH: usize = 50;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Allowlist unavailable: {0}")]
    Allowlist(#[source] NewsError),
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Bodies must be strictly longer than this many characters
    pub min_body_length: usize,
    /// Applied to every feed fetch and page extraction
    pub retry: RetryPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            min_body_length: DEFAULT_MIN_BODY_LENGTH,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct IngestionPipeline {
    feeds: Arc<dyn FeedSource>,
    extractor: Arc<dyn ContentExtractor>,
    validator: UrlValidator,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        extractor: Arc<dyn ContentExtractor>,
        validator: UrlValidator,
        config: IngestionConfig,
    ) -> Self {
        Self {
            feeds,
            extractor,
            validator,
            config,
        }
    }

    /// Collect new articles, loading the allowlist from `allowlist_path`.
    ///
    /// The allowlist is only read when there is at least one uncached URL. An
    /// empty result is the normal "nothing new" outcome, not an error.
    #[instrument(skip(self, feed_urls, cache, allowlist_path), fields(feeds = feed_urls.len()))]
    pub async fn collect(
        &self,
        feed_urls: &[String],
        cache: &mut DedupCache,
        allowlist_path: impl AsRef<Path>,
    ) -> Result<Vec<Article>, IngestionError> {
        let candidates = self.candidate_urls(feed_urls, cache).await;
        if candidates.is_empty() {
            info!("No new articles to process");
            return Ok(Vec::new());
        }

        let allowlist = Allowlist::load(allowlist_path).map_err(IngestionError::Allowlist)?;
        Ok(self.admit_and_extract(candidates, cache, &allowlist).await)
    }

    /// Collect new articles against an already loaded allowlist
    #[instrument(skip(self, feed_urls, cache, allowlist), fields(feeds = feed_urls.len()))]
    pub async fn collect_with_allowlist(
        &self,
        feed_urls: &[String],
        cache: &mut DedupCache,
        allowlist: &Allowlist,
    ) -> Vec<Article> {
        let candidates = self.candidate_urls(feed_urls, cache).await;
        if candidates.is_empty() {
            info!("No new articles to process");
            return Vec::new();
        }

        self.admit_and_extract(candidates, cache, allowlist).await
    }

    /// Feed links, deduplicated in first-seen order, minus cache hits
    async fn candidate_urls(&self, feed_urls: &[String], cache: &mut DedupCache) -> Vec<String> {
        let links = self.fetch_links(feed_urls).await;
        let total = links.len();

        let mut seen = HashSet::new();
        let unique: Vec<String> = links
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let fresh: Vec<String> = unique
            .into_iter()
            .filter(|url| {
                let cached = cache.is_cached(url);
                if cached {
                    debug!("Skipping cached article: {}", url);
                }
                !cached
            })
            .collect();

        info!("Collected {} links, {} new", total, fresh.len());
        fresh
    }

    /// Links of every feed, feed order then entry order. A feed that still
    /// fails after retries is logged and contributes nothing.
    async fn fetch_links(&self, feed_urls: &[String]) -> Vec<String> {
        let mut links = Vec::new();

        for feed_url in feed_urls {
            let feeds = &self.feeds;
            let url = feed_url.as_str();
            match self
                .config
                .retry
                .run("feed", move || async move { feeds.entry_links(url).await })
                .await
            {
                Ok(entries) => {
                    debug!("Fetched {} links from {}", entries.len(), feed_url);
                    links.extend(entries);
                }
                Err(e) => warn!("Failed to fetch RSS feed {}: {}", feed_url, e),
            }
        }

        links
    }

    async fn extract(&self, url: &str) -> Result<ArticleContent, NewsError> {
        let extractor = &self.extractor;
        self.config
            .retry
            .run("extract", move || async move { extractor.extract(url).await })
            .await
    }

    async fn admit_and_extract(
        &self,
        urls: Vec<String>,
        cache: &mut DedupCache,
        allowlist: &Allowlist,
    ) -> Vec<Article> {
        let mut articles = Vec::new();

        for url in urls {
            let outcome = self.validator.validate(&url, allowlist).await;
            if let Some(reason) = outcome.reason() {
                warn!("Rejected URL {}: {}", url, reason);
                continue;
            }

            let content = match self.extract(&url).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to extract article from {}: {}", url, e);
                    continue;
                }
            };

            let Some(article) = Article::accept(
                url.as_str(),
                content.title,
                Some(content.text),
                content.fallback_text,
                content.publish_date,
                self.config.min_body_length,
            ) else {
                debug!("Skipping {}: body too short", url);
                continue;
            };

            cache.add(&url);
            info!("Collected article: {}", article.title);
            articles.push(article);
        }

        info!("Accepted {} articles", articles.len());
        articles
    }
}
