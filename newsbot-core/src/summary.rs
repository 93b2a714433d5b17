//! Summarization output data structures

use serde::{Deserialize, Serialize};

/// Summary of a single article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRecord {
    /// Source article title
    pub title: String,
    /// Source article URL
    pub url: String,
    /// Ordered key points, never empty
    pub summary_points: Vec<String>,
}

/// Outcome of one summarization run
///
/// `summaries` follows job completion order, not input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub summaries: Vec<SummaryRecord>,
    /// Jobs whose error survived all retries
    pub failed_count: usize,
    /// Estimated input tokens of every scheduled article
    pub estimated_tokens: usize,
    /// Articles never scheduled because the token budget ran out
    pub skipped_due_to_budget: usize,
}

/// Coarse classification of a run for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Nothing was scheduled
    NothingToDo,
    /// Every scheduled job succeeded
    Completed,
    /// At least one summary, with failures or budget skips
    Partial,
    /// Jobs were scheduled but none produced a summary
    TotalFailure,
}

impl RunResult {
    pub fn limit_reached(&self) -> bool {
        self.skipped_due_to_budget > 0
    }

    /// Number of jobs that were actually scheduled
    pub fn scheduled_count(&self) -> usize {
        self.summaries.len() + self.failed_count
    }

    pub fn status(&self) -> RunStatus {
        if self.scheduled_count() == 0 {
            if self.limit_reached() {
                RunStatus::TotalFailure
            } else {
                RunStatus::NothingToDo
            }
        } else if self.summaries.is_empty() {
            RunStatus::TotalFailure
        } else if self.failed_count > 0 || self.limit_reached() {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> SummaryRecord {
        SummaryRecord {
            title: format!("Article {}", n),
            url: format!("https://example.com/{}", n),
            summary_points: vec!["point".to_string()],
        }
    }

    #[test]
    fn test_limit_reached_derived_from_skips() {
        let mut result = RunResult::default();
        assert!(!result.limit_reached());
        result.skipped_due_to_budget = 1;
        assert!(result.limit_reached());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(RunResult::default().status(), RunStatus::NothingToDo);

        let completed = RunResult {
            summaries: vec![record(1), record(2)],
            ..Default::default()
        };
        assert_eq!(completed.status(), RunStatus::Completed);

        let partial = RunResult {
            summaries: vec![record(1)],
            failed_count: 1,
            ..Default::default()
        };
        assert_eq!(partial.status(), RunStatus::Partial);

        let failed = RunResult {
            failed_count: 3,
            ..Default::default()
        };
        assert_eq!(failed.status(), RunStatus::TotalFailure);
    }

    #[test]
    fn test_budget_too_small_for_first_article_is_total_failure() {
        let result = RunResult {
            skipped_due_to_budget: 2,
            ..Default::default()
        };
        assert_eq!(result.status(), RunStatus::TotalFailure);
    }
}
