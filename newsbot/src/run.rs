//! One end-to-end run: collect, cap, summarize, write

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use newsbot_core::{RunResult, RunStatus};
use newsbot_feeds::{Allowlist, HtmlExtractor, RssClient, UrlValidator};
use newsbot_llm::OpenAIClient;
use newsbot_services::{
    DedupCache, IngestionConfig, IngestionPipeline, RetryPolicy, Summarizer, SummarizerConfig,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::NewsbotConfig;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Counters logged as a single line at the end of every run
#[derive(Debug, Default, Serialize)]
pub struct RunMetrics {
    pub articles_collected: usize,
    pub articles_after_limit: usize,
    pub summaries_generated: usize,
    pub summaries_failed: usize,
    pub tokens_estimated: usize,
    pub token_limit_reached: bool,
    pub duration_seconds: f64,
}

impl RunMetrics {
    fn record(&mut self, result: &RunResult) {
        self.summaries_generated = result.summaries.len();
        self.summaries_failed = result.failed_count;
        self.tokens_estimated = result.estimated_tokens;
        self.token_limit_reached = result.limit_reached();
    }

    fn emit(mut self, started: Instant) {
        self.duration_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        match serde_json::to_string(&self) {
            Ok(json) => info!("run_metrics={}", json),
            Err(e) => error!("Failed to serialize run metrics: {}", e),
        }
    }
}

pub async fn run(config: &NewsbotConfig) -> anyhow::Result<ExitCode> {
    let started = Instant::now();
    let mut metrics = RunMetrics::default();

    // Loaded up front so a broken allowlist fails before any network traffic
    let allowlist = Allowlist::load(&config.allowlist_path)
        .with_context(|| format!("loading allowlist {}", config.allowlist_path.display()))?;
    info!("Loaded {} allowlisted domains", allowlist.len());

    let mut cache = DedupCache::open(&config.cache_path, config.cache_duration_hours);

    let ingestion = IngestionPipeline::new(
        Arc::new(RssClient::with_timeout(FETCH_TIMEOUT)),
        Arc::new(HtmlExtractor::new(FETCH_TIMEOUT)?),
        UrlValidator::new(),
        IngestionConfig {
            min_body_length: config.min_body_length,
            ..IngestionConfig::default()
        },
    );

    info!("Step 1: Collecting articles from {} feeds", config.rss_feeds.len());
    let mut articles = ingestion
        .collect_with_allowlist(&config.rss_feeds, &mut cache, &allowlist)
        .await;
    metrics.articles_collected = articles.len();

    if articles.is_empty() {
        info!("No new articles to process. Exiting.");
        metrics.emit(started);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(max_articles) = config.max_articles_per_run {
        if articles.len() > max_articles {
            warn!(
                "MAX_ARTICLES_PER_RUN={} enforced. Truncating from {} to {} articles.",
                max_articles,
                articles.len(),
                max_articles
            );
            articles.truncate(max_articles);
        }
    }
    metrics.articles_after_limit = articles.len();

    info!("Step 2: Summarizing {} articles", articles.len());
    let generator = match &config.openai_base_url {
        Some(base_url) => OpenAIClient::with_base_url(
            config.openai_api_key.as_str(),
            config.openai_model.as_str(),
            base_url.as_str(),
        )?,
        None => OpenAIClient::new(config.openai_api_key.as_str(), config.openai_model.as_str())?,
    };
    let summarizer = Summarizer::new(
        Arc::new(generator),
        SummarizerConfig {
            concurrency: config.summary_concurrency,
            max_points: config.summary_max_points,
            token_budget: config.max_tokens_per_run,
            input_chars: config.summary_input_chars,
            temperature: None,
            retry: RetryPolicy::default(),
        },
    );

    let result = summarizer.summarize(&articles).await;
    metrics.record(&result);

    match result.status() {
        RunStatus::TotalFailure => {
            error!("No summaries generated. Exiting.");
            metrics.emit(started);
            return Ok(ExitCode::FAILURE);
        }
        RunStatus::Partial => {
            if result.failed_count > 0 {
                warn!("Summarization had {} failures.", result.failed_count);
            }
            if result.limit_reached() {
                warn!("Token budget reached during summarization; partial output will be used.");
            }
        }
        RunStatus::Completed | RunStatus::NothingToDo => {}
    }

    info!("Step 3: Writing summaries to {}", config.output_path.display());
    write_output(&config.output_path, &result)?;

    metrics.emit(started);
    Ok(ExitCode::SUCCESS)
}

/// Write the run result as pretty JSON, creating parent directories
pub fn write_output(path: &Path, result: &RunResult) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsbot_core::SummaryRecord;

    #[test]
    fn test_metrics_record_result() {
        let result = RunResult {
            summaries: vec![SummaryRecord {
                title: "T".to_string(),
                url: "https://a.example/1".to_string(),
                summary_points: vec!["point".to_string()],
            }],
            failed_count: 2,
            estimated_tokens: 900,
            skipped_due_to_budget: 1,
        };

        let mut metrics = RunMetrics::default();
        metrics.record(&result);
        assert_eq!(metrics.summaries_generated, 1);
        assert_eq!(metrics.summaries_failed, 2);
        assert_eq!(metrics.tokens_estimated, 900);
        assert!(metrics.token_limit_reached);
    }

    #[test]
    fn test_write_output_creates_directories() {
        let dir = std::env::temp_dir().join(format!("newsbot-out-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("summaries.json");
        let result = RunResult {
            estimated_tokens: 300,
            ..RunResult::default()
        };

        write_output(&path, &result).unwrap();

        let written: RunResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, result);

        std::fs::remove_dir_all(&dir).ok();
    }
}
