//! TOML configuration parsing and validation.
//!
//! ```toml
//! [corpus]
//! path = "./data/corpus.csv"
//!
//! [source]
//! root = "./pages"
//! max_depth = 1
//!
//! [chunking]
//! max_tokens = 1600
//!
//! [prompt]
//! domain = "Manchester United F.C."
//!
//! [embedding]
//! provider = "openai"
//!
//! [completion]
//! provider = "openai"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Every section except `[corpus]` has defaults. See [`load_config`] for the
//! validation rules.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use docent_core::prompt::{PromptTemplate, DEFAULT_TOKEN_BUDGET};
use docent_core::rank::DEFAULT_TOP_N;
use docent_core::split::DEFAULT_MAX_RECURSION;
use docent_core::tokenizer::Tokenizer;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_root")]
    pub root: PathBuf,
    /// How many levels of subcategories (subdirectories) to descend into.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_sections_to_ignore")]
    pub sections_to_ignore: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_source_root(),
            max_depth: default_max_depth(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            sections_to_ignore: default_sections_to_ignore(),
        }
    }
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./pages")
}
fn default_max_depth() -> usize {
    1
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.wiki".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}
fn default_sections_to_ignore() -> Vec<String> {
    [
        "See also",
        "References",
        "External links",
        "Further reading",
        "Footnotes",
        "Bibliography",
        "Sources",
        "Citations",
        "Literature",
        "Notes and references",
        "Photo gallery",
        "Works cited",
        "Photos",
        "Gallery",
        "Notes",
        "References and sources",
        "References and notes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_max_recursion")]
    pub max_recursion: usize,
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
    /// Model whose tokenizer measures passage length.
    #[serde(default = "default_chat_model")]
    pub model: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_recursion: default_max_recursion(),
            min_section_chars: default_min_section_chars(),
            model: default_chat_model(),
        }
    }
}

fn default_max_tokens() -> usize {
    1600
}
fn default_max_recursion() -> usize {
    DEFAULT_MAX_RECURSION
}
fn default_min_section_chars() -> usize {
    docent_core::clean::DEFAULT_MIN_SECTION_CHARS
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Chat model used for completions and for counting prompt tokens.
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub preamble: Option<String>,
    #[serde(default)]
    pub section_label: Option<String>,
    /// Reply sent to the user when a query cannot be answered.
    #[serde(default = "default_apology")]
    pub apology: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            token_budget: default_token_budget(),
            domain: default_domain(),
            system_message: None,
            preamble: None,
            section_label: None,
            apology: default_apology(),
        }
    }
}

impl PromptConfig {
    /// The domain template with any configured overrides applied.
    pub fn template(&self) -> PromptTemplate {
        let mut template = PromptTemplate::for_domain(&self.domain);
        if let Some(ref system) = self.system_message {
            template.system = system.clone();
        }
        if let Some(ref preamble) = self.preamble {
            template.preamble = preamble.clone();
        }
        if let Some(ref label) = self.section_label {
            template.section_label = label.clone();
        }
        template
    }
}

fn default_token_budget() -> usize {
    DEFAULT_TOKEN_BUDGET
}
fn default_domain() -> String {
    "the knowledge base".to_string()
}
fn default_apology() -> String {
    "Sorry, I couldn't answer that right now. Please try again.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_completion_retries")]
    pub max_retries: u32,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            max_retries: default_completion_retries(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_completion_retries() -> u32 {
    3
}
fn default_completion_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.max_recursion > 32 {
        bail!("chunking.max_recursion must be <= 32");
    }
    if config.retrieval.top_n < 1 {
        bail!("retrieval.top_n must be >= 1");
    }
    if config.prompt.token_budget == 0 {
        bail!("prompt.token_budget must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if config.completion.temperature != 0.0 {
        warn!(
            temperature = config.completion.temperature,
            "non-zero completion temperature makes answers non-reproducible"
        );
    }

    for (key, provider) in [
        ("embedding", config.embedding.provider.as_str()),
        ("completion", config.completion.provider.as_str()),
    ] {
        match provider {
            "disabled" | "openai" => {}
            other => bail!(
                "Unknown {} provider: '{}'. Must be disabled or openai.",
                key,
                other
            ),
        }
    }

    Tokenizer::for_model(&config.chunking.model).context("chunking.model")?;
    Tokenizer::for_model(&config.prompt.model).context("prompt.model")?;

    Ok(config)
}
