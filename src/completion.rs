//! Chat completion providers.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docent_core::{DocentError, Result};

use crate::config::CompletionConfig;
use crate::openai::{self, CallError};

#[async_trait]
pub trait Completer: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send one system/user message pair and return the reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

pub struct DisabledCompleter;

#[async_trait]
impl Completer for DisabledCompleter {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(DocentError::CompletionFailed(
            "completion provider is disabled".to_string(),
        ))
    }
}

pub struct OpenAICompleter {
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAICompleter {
    /// `model` is the chat model, shared with the prompt tokenizer.
    pub fn new(config: &CompletionConfig, model: &str, api_key: String) -> anyhow::Result<Self> {
        let client = openai::build_client(config.timeout_secs)
            .context("failed to build completion HTTP client")?;
        Ok(Self {
            model: model.to_string(),
            url: openai::endpoint(&config.api_base, "chat/completions"),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn map_error(&self, err: CallError) -> DocentError {
        match err {
            CallError::Timeout => DocentError::ProviderTimeout {
                operation: "completion",
                secs: self.timeout_secs,
            },
            CallError::Failed(message) => DocentError::CompletionFailed(message),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Completer for OpenAICompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        let response =
            openai::post_with_retry(&self.client, &self.url, &self.api_key, &body, self.max_retries)
                .await
                .map_err(|e| self.map_error(e))?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_error(CallError::Timeout)
            } else {
                DocentError::CompletionFailed(format!("invalid response: {}", e))
            }
        })?;

        first_content(parsed)
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .ok_or_else(|| DocentError::CompletionFailed("response contained no message".to_string()))
}

/// Create the completer named by `config.provider`, talking to `model`.
pub fn create_completer(config: &CompletionConfig, model: &str) -> anyhow::Result<Box<dyn Completer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledCompleter)),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).with_context(|| {
                format!("{} environment variable not set", config.api_key_env)
            })?;
            Ok(Box::new(OpenAICompleter::new(config, model, api_key)?))
        }
        other => bail!("Unknown completion provider: {}", other),
    }
}
