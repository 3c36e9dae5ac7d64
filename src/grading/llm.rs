// src/grading/llm.rs

//! Text completion client used by the essay grader.
//!
//! Speaks the OpenAI-compatible chat completions API, so any compatible
//! provider (OpenAI, Azure, Gemini's compatibility endpoint, ...) works.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] OpenAIError),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM client is not configured")]
    NotConfigured,
}

/// Opaque text completion: system + user message in, free text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_message: &str, user_message: &str)
    -> Result<String, LlmError>;
}

pub struct OpenAiCompletion {
    client: Client<OpenAIConfig>,
    model_name: String,
    configured: bool,
}

impl OpenAiCompletion {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            configured: !config.llm_api_key.is_empty(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        if !self.configured {
            return Err(LlmError::NotConfigured);
        }

        debug!(
            "Calling LLM, model: {}, prompt length: {}",
            self.model_name,
            user_message.len()
        );

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_message)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .max_tokens(1024u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API call failed: {}", e);
            LlmError::from(e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}
