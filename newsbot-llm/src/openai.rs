use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::LlmError;
use crate::generator::TextGenerator;

/// Default per-request timeout for completions
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::build(OpenAIConfig::new().with_api_key(api_key), model.into())
    }

    /// Point the client at an OpenAI-compatible endpoint
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self::build(config, model.into())
    }

    fn build(config: OpenAIConfig, model: String) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages([
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| LlmError::InvalidRequest(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| LlmError::InvalidRequest(e.to_string()))?
                .into(),
        ]);
        if let Some(temperature) = temperature {
            builder.temperature(temperature);
        }
        let request = builder
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!("Generated {} chars", content.len());
        Ok(content)
    }
}
