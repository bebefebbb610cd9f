//! Embedding providers.
//!
//! - **[`DisabledEmbedder`]**: always fails; used when `embedding.provider = "disabled"`.
//! - **[`OpenAIEmbedder`]**: calls `{api_base}/embeddings` with batching, retry, and backoff.
//!
//! Use [`create_embedder`] to pick one from configuration.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docent_core::models::EmbeddingVector;
use docent_core::{DocentError, Result};

use crate::config::EmbeddingConfig;
use crate::openai::{self, CallError};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier reported in logs and `docent stats`.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts. The output has one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Embed a single text, e.g. a user query.
    async fn embed_one(&self, text: &str) -> Result<EmbeddingVector> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocentError::EmbeddingFailed("empty embedding response".to_string()))
    }
}

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        Err(DocentError::EmbeddingFailed(
            "embedding provider is disabled".to_string(),
        ))
    }
}

pub struct OpenAIEmbedder {
    model: String,
    url: String,
    api_key: String,
    max_retries: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> anyhow::Result<Self> {
        let client = openai::build_client(config.timeout_secs)
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            model: config.model.clone(),
            url: openai::endpoint(&config.api_base, "embeddings"),
            api_key,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn map_error(&self, err: CallError) -> DocentError {
        match err {
            CallError::Timeout => DocentError::ProviderTimeout {
                operation: "embedding",
                secs: self.timeout_secs,
            },
            CallError::Failed(message) => DocentError::EmbeddingFailed(message),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: EmbeddingVector,
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response =
            openai::post_with_retry(&self.client, &self.url, &self.api_key, &body, self.max_retries)
                .await
                .map_err(|e| self.map_error(e))?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_error(CallError::Timeout)
            } else {
                DocentError::EmbeddingFailed(format!("invalid response: {}", e))
            }
        })?;

        into_ordered_vectors(parsed.data, texts.len())
    }
}

/// Put response items back in input order and check there is one per input.
fn into_ordered_vectors(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<EmbeddingVector>> {
    if data.len() != expected {
        return Err(DocentError::EmbeddingFailed(format!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

/// Create the embedder named by `config.provider`.
///
/// The OpenAI provider reads its key from the environment variable named by
/// `api_key_env`; a missing key is an error.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).with_context(|| {
                format!("{} environment variable not set", config.api_key_env)
            })?;
            Ok(Box::new(OpenAIEmbedder::new(config, api_key)?))
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}
