//! Chat completions over the OpenAI-compatible API (OpenAI, Together AI).

use super::{GenerationOptions, Generator};
use crate::error::{LexragError, Result};
use crate::openai::{create_client, ApiFlavor};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, Stop,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Generator backed by a chat completions endpoint.
pub struct ChatGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: Option<u32>,
}

impl ChatGenerator {
    /// Create a new generator. Fails if the provider's API key is not set.
    pub fn new(flavor: ApiFlavor, model: &str, timeout: Duration) -> Result<Self> {
        let client = create_client(flavor, timeout)?;

        Ok(Self {
            client,
            model: model.to_string(),
            max_tokens: None,
        })
    }

    /// Default completion length when a call doesn't set one.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| LexragError::Generation(e.to_string()))?
                .into(),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(options.temperature);

        if let Some(max_tokens) = options.max_tokens.or(self.max_tokens) {
            args.max_tokens(max_tokens);
        }
        if let Some(stop) = options.stop.as_ref().filter(|s| !s.is_empty()) {
            args.stop(Stop::StringArray(stop.clone()));
        }

        let request = args
            .build()
            .map_err(|e| LexragError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            LexragError::Generation(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| LexragError::Generation("Empty response from LLM".to_string()))?
            .clone();

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }
}
