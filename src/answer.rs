//! The query pipeline: embed → rank → assemble → complete.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use docent_core::corpus::CorpusStore;
use docent_core::models::PromptMessage;
use docent_core::prompt::{assemble, PromptTemplate};
use docent_core::tokenizer::Tokenizer;
use docent_core::{DocentError, Result};

use crate::completion::{create_completer, Completer};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};

/// Prompt and retrieval settings for one [`Answerer`].
#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub template: PromptTemplate,
    pub token_budget: usize,
    pub top_n: usize,
    pub apology: String,
}

impl AnswerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            template: config.prompt.template(),
            token_budget: config.prompt.token_budget,
            top_n: config.retrieval.top_n,
            apology: config.prompt.apology.clone(),
        }
    }
}

/// A completed answer and what went into it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Passages packed into the prompt.
    pub passages: usize,
    /// Similarity of the best-ranked passage, if the corpus was not empty.
    pub top_score: Option<f32>,
}

/// A passage returned by [`Answerer::search`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: f32,
    pub text: String,
}

/// Answers questions from a loaded corpus. Shared read-only across requests.
pub struct Answerer {
    corpus: Arc<CorpusStore>,
    tokenizer: Tokenizer,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
    settings: AnswerSettings,
}

impl Answerer {
    pub fn new(
        corpus: Arc<CorpusStore>,
        tokenizer: Tokenizer,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            corpus,
            tokenizer,
            embedder,
            completer,
            settings,
        }
    }

    /// Wire up providers and tokenizer from configuration.
    pub fn from_config(config: &Config, corpus: Arc<CorpusStore>) -> anyhow::Result<Self> {
        let tokenizer = Tokenizer::for_model(&config.prompt.model)?;
        let embedder: Arc<dyn Embedder> = create_embedder(&config.embedding)?.into();
        let completer: Arc<dyn Completer> =
            create_completer(&config.completion, &config.prompt.model)?.into();
        Ok(Self::new(
            corpus,
            tokenizer,
            embedder,
            completer,
            AnswerSettings::from_config(config),
        ))
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    pub fn settings(&self) -> &AnswerSettings {
        &self.settings
    }

    /// Rank the corpus against `query` and return the best `limit` passages.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = non_empty(query)?;
        let embedding = self.embedder.embed_one(query).await?;
        let ranked = self.corpus.rank(&embedding, limit)?;
        Ok(ranked
            .into_iter()
            .map(|r| SearchHit {
                score: r.score,
                text: r.text.to_string(),
            })
            .collect())
    }

    /// Build the prompt for `query` without calling the completion service.
    pub async fn prompt(&self, query: &str) -> Result<(PromptMessage, Option<f32>)> {
        let query = non_empty(query)?;
        let embedding = self.embedder.embed_one(query).await?;
        let ranked = self.corpus.rank(&embedding, self.settings.top_n)?;
        let top_score = ranked.first().map(|r| r.score);
        let message = assemble(
            query,
            &ranked,
            &self.settings.template,
            &self.tokenizer,
            self.settings.token_budget,
        );
        debug!(
            candidates = ranked.len(),
            passages = message.passages,
            "assembled prompt"
        );
        Ok((message, top_score))
    }

    /// Answer `query`, surfacing any pipeline failure.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        self.ask_with_prompt(query).await.map(|(_, answer)| answer)
    }

    /// Answer `query` and return the exact prompt the answer was completed from.
    pub async fn ask_with_prompt(&self, query: &str) -> Result<(PromptMessage, Answer)> {
        let (message, top_score) = self.prompt(query).await?;
        let text = self
            .completer
            .complete(&message.system, &message.user)
            .await?;
        info!(
            passages = message.passages,
            top_score = top_score.unwrap_or_default(),
            "answered query"
        );
        let answer = Answer {
            text,
            passages: message.passages,
            top_score,
        };
        Ok((message, answer))
    }

    /// Answer `query` for an end user. Never fails: any error is logged and
    /// replaced by the configured apology.
    pub async fn respond(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return self.settings.apology.clone();
        }
        match self.ask(query).await {
            Ok(answer) => answer.text,
            Err(e) => self.apologize(&e),
        }
    }

    /// Log a failed query and return the apology shown in its place.
    pub fn apologize(&self, err: &DocentError) -> String {
        error!(error = %err, transient = err.is_transient(), "failed to answer query");
        self.settings.apology.clone()
    }
}

fn non_empty(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(DocentError::EmptyQuery);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docent_core::models::{CorpusRecord, EmbeddingVector};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps queries mentioning "founded" to the first axis, everything else to the second.
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("founded") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    /// Echoes the number of passage blocks it was shown.
    struct CountingCompleter;

    #[async_trait]
    impl Completer for CountingCompleter {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            assert!(!system.is_empty());
            Ok(format!("blocks={}", user.matches("\"\"\"\n").count() / 2))
        }
    }

    struct FailingCompleter;

    #[async_trait]
    impl Completer for FailingCompleter {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(DocentError::CompletionFailed("API error 500".to_string()))
        }
    }

    fn corpus() -> Arc<CorpusStore> {
        Arc::new(
            CorpusStore::new(vec![
                CorpusRecord::new("Stadium\n\nOld Trafford holds 74,310.", vec![0.1, 0.9]),
                CorpusRecord::new("History\n\nThe club was founded in 1878.", vec![0.9, 0.1]),
            ])
            .unwrap(),
        )
    }

    fn settings() -> AnswerSettings {
        AnswerSettings {
            template: PromptTemplate::for_domain("Manchester United F.C."),
            token_budget: 3596,
            top_n: 100,
            apology: "Sorry, I couldn't answer that right now. Please try again.".to_string(),
        }
    }

    fn answerer(completer: Arc<dyn Completer>) -> (Answerer, Arc<KeywordEmbedder>) {
        let embedder = Arc::new(KeywordEmbedder {
            calls: AtomicUsize::new(0),
        });
        let answerer = Answerer::new(
            corpus(),
            Tokenizer::for_model("gpt-3.5-turbo").unwrap(),
            embedder.clone(),
            completer,
            settings(),
        );
        (answerer, embedder)
    }

    #[tokio::test]
    async fn test_prompt_puts_best_passage_first() {
        let (answerer, _) = answerer(Arc::new(CountingCompleter));
        let (message, top_score) = answerer.prompt("When was the club founded?").await.unwrap();
        assert_eq!(message.passages, 2);
        let founded = message.user.find("founded in 1878").unwrap();
        let stadium = message.user.find("74,310").unwrap();
        assert!(founded < stadium);
        assert!(top_score.unwrap() > 0.9);
        assert!(message.user.ends_with("Question: When was the club founded?"));
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let (answerer, _) = answerer(Arc::new(CountingCompleter));
        let answer = answerer.ask("When was the club founded?").await.unwrap();
        assert_eq!(answer.text, "blocks=2");
        assert_eq!(answer.passages, 2);
    }

    #[tokio::test]
    async fn test_respond_apologizes_on_failure() {
        let (answerer, _) = answerer(Arc::new(FailingCompleter));
        let reply = answerer.respond("When was the club founded?").await;
        assert_eq!(reply, settings().apology);
    }

    #[tokio::test]
    async fn test_empty_query_skips_providers() {
        let (answerer, embedder) = answerer(Arc::new(CountingCompleter));
        assert_eq!(answerer.respond("   ").await, settings().apology);
        assert!(matches!(
            answerer.ask("").await.unwrap_err(),
            DocentError::EmptyQuery
        ));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_with_prompt_embeds_once() {
        let (answerer, embedder) = answerer(Arc::new(CountingCompleter));
        let (message, answer) = answerer
            .ask_with_prompt("When was the club founded?")
            .await
            .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.passages, message.passages);
        assert_eq!(answer.text, format!("blocks={}", message.passages));
    }

    #[tokio::test]
    async fn test_apologize_returns_configured_apology() {
        let (answerer, _) = answerer(Arc::new(FailingCompleter));
        let err = DocentError::CompletionFailed("API error 500".to_string());
        assert_eq!(answerer.apologize(&err), settings().apology);
    }

    #[tokio::test]
    async fn test_search_limit() {
        let (answerer, _) = answerer(Arc::new(CountingCompleter));
        let hits = answerer.search("stadium capacity", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("74,310"));
    }
}
