//! Concurrent summarization engine
//!
//! A single coordinator walks the articles in input order, applies the token
//! budget, and feeds the admitted jobs into a bounded pool. Each job reports a
//! tagged outcome and the coordinator does all the counting.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use newsbot_core::{Article, RunResult, SummaryRecord};
use newsbot_llm::{LlmError, TextGenerator};
use tracing::{debug, error, info, instrument, warn};

use crate::retry::RetryPolicy;
use crate::summary_parser::parse_summary_points;

/// Minimum estimated cost of any article
const MIN_ESTIMATED_TOKENS: usize = 100;

/// Fixed per-article overhead for prompt and response
const TOKEN_OVERHEAD: usize = 200;

/// Characters per token used by the estimate
const CHARS_PER_TOKEN: usize = 4;

const SYSTEM_PROMPT: &str = "You summarize news articles for a digest. \
Reply only with a bulleted list, one key point per line, each line starting with \"- \". \
Do not add a heading or closing remarks.";

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Maximum jobs in flight
    pub concurrency: usize,
    /// Upper bound on points per summary
    pub max_points: usize,
    /// Estimated token ceiling for one run, `None` for unlimited
    pub token_budget: Option<usize>,
    /// Body characters sent to the model
    pub input_chars: usize,
    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,
    pub retry: RetryPolicy,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_points: 8,
            token_budget: None,
            input_chars: 3000,
            temperature: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Rough token cost of summarizing `text`
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return MIN_ESTIMATED_TOKENS;
    }
    (text.chars().count() / CHARS_PER_TOKEN + TOKEN_OVERHEAD).max(MIN_ESTIMATED_TOKENS)
}

/// Result of applying the token budget to an ordered list of costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BudgetPlan {
    /// Length of the scheduled prefix
    pub scheduled: usize,
    /// Sum of the scheduled costs
    pub estimated_tokens: usize,
    /// Everything after the scheduled prefix
    pub skipped: usize,
}

/// Admit costs in order until the next one would exceed `budget`.
///
/// The cutoff is final: once one cost does not fit, it and every later cost
/// are skipped even if a later one would fit.
pub fn plan_schedule<I>(costs: I, budget: Option<usize>) -> BudgetPlan
where
    I: IntoIterator<Item = usize>,
{
    let costs: Vec<usize> = costs.into_iter().collect();
    let mut plan = BudgetPlan::default();

    for (index, cost) in costs.iter().enumerate() {
        if let Some(budget) = budget {
            if plan.estimated_tokens.saturating_add(*cost) > budget {
                plan.skipped = costs.len() - index;
                break;
            }
        }
        plan.estimated_tokens += cost;
        plan.scheduled += 1;
    }

    plan
}

/// Outcome of a single summarization job
#[derive(Debug)]
enum JobOutcome {
    Summarized(SummaryRecord),
    Failed { url: String, error: LlmError },
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SummarizerConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `articles` with bounded concurrency under the token budget.
    ///
    /// Individual failures are counted, never propagated. The order of
    /// `summaries` follows job completion, not input order.
    #[instrument(skip(self, articles), fields(articles = articles.len()))]
    pub async fn summarize(&self, articles: &[Article]) -> RunResult {
        let total = articles.len();
        let plan = plan_schedule(
            articles.iter().map(|article| estimate_tokens(&article.text)),
            self.config.token_budget,
        );

        if plan.skipped > 0 {
            warn!(
                "Token budget ({}) would be exceeded. Skipping remaining {} articles.",
                self.config.token_budget.unwrap_or_default(),
                plan.skipped
            );
        }

        let outcomes: Vec<JobOutcome> = stream::iter(articles[..plan.scheduled].iter().enumerate())
            .map(|(index, article)| self.run_job(index + 1, total, article))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut result = RunResult {
            estimated_tokens: plan.estimated_tokens,
            skipped_due_to_budget: plan.skipped,
            ..RunResult::default()
        };

        for outcome in outcomes {
            match outcome {
                JobOutcome::Summarized(record) => result.summaries.push(record),
                JobOutcome::Failed { url, error } => {
                    error!("Skipping article {} due to summarization error: {}", url, error);
                    result.failed_count += 1;
                }
            }
        }

        info!(
            "Successfully summarized {}/{} articles (failed={}, skipped={})",
            result.summaries.len(),
            total,
            result.failed_count,
            result.skipped_due_to_budget
        );

        result
    }

    async fn run_job(&self, index: usize, total: usize, article: &Article) -> JobOutcome {
        info!(
            "Summarizing article {}/{}: {}",
            index,
            total,
            article.title.chars().take(50).collect::<String>()
        );

        match self.summarize_article(article).await {
            Ok(record) => JobOutcome::Summarized(record),
            Err(error) => JobOutcome::Failed {
                url: article.url.clone(),
                error,
            },
        }
    }

    /// Summarize one article, retrying transient generator failures
    pub async fn summarize_article(&self, article: &Article) -> Result<SummaryRecord, LlmError> {
        let user_prompt = build_user_prompt(article, self.config.input_chars);
        let system_prompt = format!(
            "{} Write at most {} points.",
            SYSTEM_PROMPT, self.config.max_points
        );

        let generator = &self.generator;
        let system = system_prompt.as_str();
        let user = user_prompt.as_str();
        let temperature = self.config.temperature;

        let response = self
            .config
            .retry
            .run("llm", move || async move {
                generator.generate(system, user, temperature).await
            })
            .await?;

        let summary_points = parse_summary_points(&response, self.config.max_points);
        if summary_points.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        if summary_points.len() == 1 && summary_points[0] == response {
            warn!("Unstructured summary for {}, keeping raw response", article.url);
        }

        debug!("Summarized {} into {} points", article.url, summary_points.len());
        Ok(SummaryRecord {
            title: article.title.clone(),
            url: article.url.clone(),
            summary_points,
        })
    }
}

fn build_user_prompt(article: &Article, input_chars: usize) -> String {
    format!(
        "Title: {}\n\nArticle:\n{}",
        article.title,
        truncate_chars(&article.text, input_chars)
    )
}

/// Longest prefix of `text` holding at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const GOOD_SUMMARY: &str =
        "- The first key point of the story\n- The second key point of the story\n- The third key point of the story";

    fn article(url: &str, title: &str, chars: usize) -> Article {
        Article {
            url: url.to_string(),
            title: title.to_string(),
            text: "x".repeat(chars),
            fallback_summary: None,
            publish_date: None,
        }
    }

    fn fast_config() -> SummarizerConfig {
        SummarizerConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            ..SummarizerConfig::default()
        }
    }

    /// Fails permanently for titles containing "fail"
    struct TitleGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for TitleGenerator {
        async fn generate(
            &self,
            _system: &str,
            user: &str,
            _temperature: Option<f32>,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if user.contains("fail") {
                Err(LlmError::Auth("bad key".to_string()))
            } else {
                Ok(GOOD_SUMMARY.to_string())
            }
        }
    }

    fn title_generator() -> Arc<TitleGenerator> {
        Arc::new(TitleGenerator {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 100);
        assert_eq!(estimate_tokens("short"), 201);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 300);
        // Characters, not bytes
        assert_eq!(estimate_tokens(&"あ".repeat(400)), 300);
    }

    #[test]
    fn test_budget_cutoff_is_order_preserving() {
        let plan = plan_schedule([300, 300, 300], Some(650));
        assert_eq!(
            plan,
            BudgetPlan {
                scheduled: 2,
                estimated_tokens: 600,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_budget_cutoff_is_final() {
        // The cheap third article would fit but comes after the cutoff
        let plan = plan_schedule([300, 500, 100], Some(650));
        assert_eq!(plan.scheduled, 1);
        assert_eq!(plan.skipped, 2);
    }

    #[test]
    fn test_budget_exactly_met() {
        let plan = plan_schedule([300, 300], Some(600));
        assert_eq!(plan.scheduled, 2);
        assert_eq!(plan.skipped, 0);
    }

    #[test]
    fn test_unlimited_budget() {
        let plan = plan_schedule([300, 300, 300], None);
        assert_eq!(plan.scheduled, 3);
        assert_eq!(plan.estimated_tokens, 900);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn test_summarize_applies_budget() {
        let generator = title_generator();
        let summarizer = Summarizer::new(
            generator.clone(),
            SummarizerConfig {
                token_budget: Some(650),
                ..fast_config()
            },
        );

        let articles = vec![
            article("https://a.example/1", "One", 400),
            article("https://a.example/2", "Two", 400),
            article("https://a.example/3", "Three", 400),
        ];
        let result = summarizer.summarize(&articles).await;

        assert_eq!(result.summaries.len(), 2);
        assert_eq!(result.skipped_due_to_budget, 1);
        assert_eq!(result.estimated_tokens, 600);
        assert!(result.limit_reached());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let summarizer = Summarizer::new(title_generator(), fast_config());
        let articles = vec![
            article("https://a.example/1", "Good one", 400),
            article("https://a.example/2", "This will fail", 400),
            article("https://a.example/3", "Good two", 400),
        ];

        let result = summarizer.summarize(&articles).await;
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.summaries.len(), 2);
        assert!(result
            .summaries
            .iter()
            .all(|s| s.summary_points.len() == 3 && s.url != "https://a.example/2"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let summarizer = Summarizer::new(title_generator(), fast_config());
        let result = summarizer.summarize(&[]).await;
        assert_eq!(result, RunResult::default());
    }

    /// Tracks the highest number of concurrent calls
    struct SlowGenerator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _temperature: Option<f32>,
        ) -> Result<String, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(GOOD_SUMMARY.to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_a_ceiling() {
        let generator = Arc::new(SlowGenerator {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let summarizer = Summarizer::new(
            generator.clone(),
            SummarizerConfig {
                concurrency: 3,
                ..fast_config()
            },
        );

        let articles: Vec<Article> = (0..10)
            .map(|i| article(&format!("https://a.example/{}", i), "Title", 100))
            .collect();
        let result = summarizer.summarize(&articles).await;

        assert_eq!(result.summaries.len(), 10);
        assert_eq!(generator.peak.load(Ordering::SeqCst), 3);
    }

    /// Fails with a retryable status a fixed number of times
    struct FlakyGenerator {
        failures_left: AtomicUsize,
        response: String,
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _temperature: Option<f32>,
        ) -> Result<String, LlmError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(LlmError::Status {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let summarizer = Summarizer::new(
            Arc::new(FlakyGenerator {
                failures_left: AtomicUsize::new(2),
                response: GOOD_SUMMARY.to_string(),
            }),
            fast_config(),
        );

        let record = summarizer
            .summarize_article(&article("https://a.example/1", "Title", 100))
            .await
            .unwrap();
        assert_eq!(record.summary_points.len(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_as_failure() {
        let summarizer = Summarizer::new(
            Arc::new(FlakyGenerator {
                failures_left: AtomicUsize::new(10),
                response: GOOD_SUMMARY.to_string(),
            }),
            fast_config(),
        );

        let result = summarizer
            .summarize(&[article("https://a.example/1", "Title", 100)])
            .await;
        assert_eq!(result.failed_count, 1);
        assert!(result.summaries.is_empty());
    }

    #[tokio::test]
    async fn test_unstructured_response_kept_whole() {
        let raw = "A single paragraph answer without any list structure.";
        let summarizer = Summarizer::new(
            Arc::new(FlakyGenerator {
                failures_left: AtomicUsize::new(0),
                response: raw.to_string(),
            }),
            fast_config(),
        );

        let record = summarizer
            .summarize_article(&article("https://a.example/1", "Title", 100))
            .await
            .unwrap();
        assert_eq!(record.summary_points, vec![raw.to_string()]);
    }

    #[tokio::test]
    async fn test_blank_response_is_a_failure() {
        let summarizer = Summarizer::new(
            Arc::new(FlakyGenerator {
                failures_left: AtomicUsize::new(0),
                response: "  \n".to_string(),
            }),
            fast_config(),
        );

        let err = summarizer
            .summarize_article(&article("https://a.example/1", "Title", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
