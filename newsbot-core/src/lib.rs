//! Core types for newsbot
//!
//! This crate defines the shared data structures used across the pipeline,
//! including ingested articles, URL admission outcomes, summary records and
//! the transient-error classification used by the retry policy.

pub mod admission;
pub mod article;
pub mod error;
pub mod summary;

pub use admission::{RejectReason, ValidationOutcome};
pub use article::Article;
pub use error::{is_retryable_status, Transient};
pub use summary::{RunResult, RunStatus, SummaryRecord};
