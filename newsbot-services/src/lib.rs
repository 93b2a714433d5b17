//! Pipeline services for newsbot
//!
//! Ingestion (feeds to admitted articles), the persistent dedup cache, the
//! retry policy and the concurrent summarization engine.

pub mod dedup_cache;
pub mod ingestion;
pub mod retry;
pub mod summarizer;
pub mod summary_parser;

pub use dedup_cache::{DedupCache, DedupCacheError, DEFAULT_TTL_HOURS};
pub use ingestion::{IngestionConfig, IngestionError, IngestionPipeline};
pub use retry::RetryPolicy;
pub use summarizer::{estimate_tokens, plan_schedule, BudgetPlan, Summarizer, SummarizerConfig};
pub use summary_parser::parse_summary_points;
