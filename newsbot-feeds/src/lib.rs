//! Article collection clients for newsbot
//!
//! This crate provides the network-facing collaborators of the ingestion
//! pipeline:
//! - RSS/Atom feeds: entry links in feed order
//! - Content extraction: title, body, description and publish date of a page
//! - Admission control: allowlist and SSRF checks applied before any fetch

pub mod admission;
pub mod error;
pub mod extractor;
pub mod rss_client;

pub use admission::{is_forbidden_ip, Allowlist, HostResolver, SystemResolver, UrlValidator};
pub use error::NewsError;
pub use extractor::{ArticleContent, ContentExtractor, HtmlExtractor};
pub use rss_client::{parse_feed_links, FeedSource, RssClient};
