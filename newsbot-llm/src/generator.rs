//! Backend-agnostic text generation interface

use async_trait::async_trait;

use crate::error::LlmError;

/// A generative-text backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given instructions.
    ///
    /// `temperature` of `None` leaves the backend default in place.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, LlmError>;
}
