//! Core data types that flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// Separator placed between heading path entries and the body text of a passage.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// A fixed-dimensionality embedding vector.
pub type EmbeddingVector = Vec<f32>;

/// Headings from the document title down to the current subsection.
///
/// Display context only; never used for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeadingPath(Vec<String>);

impl HeadingPath {
    pub fn new(headings: Vec<String>) -> Self {
        Self(headings)
    }

    /// A path holding only the document title.
    pub fn root(title: impl Into<String>) -> Self {
        Self(vec![title.into()])
    }

    /// Extend this path with a nested heading, leaving `self` untouched.
    pub fn child(&self, heading: impl Into<String>) -> Self {
        let mut headings = self.0.clone();
        headings.push(heading.into());
        Self(headings)
    }

    pub fn headings(&self) -> &[String] {
        &self.0
    }

    /// The outermost heading (the document title), if any.
    pub fn title(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The innermost heading.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Join the headings and `body` into one passage string.
    pub fn join_with(&self, body: &str) -> String {
        let mut parts: Vec<&str> = self.0.iter().map(String::as_str).collect();
        parts.push(body);
        parts.join(PASSAGE_SEPARATOR)
    }
}

/// A heading path paired with the body text beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub headings: HeadingPath,
    pub body: String,
}

impl Section {
    pub fn new(headings: HeadingPath, body: impl Into<String>) -> Self {
        Self {
            headings,
            body: body.into(),
        }
    }

    /// Headings and body joined into a single candidate passage.
    pub fn joined(&self) -> String {
        self.headings.join_with(&self.body)
    }
}

/// A token-bounded unit of stored text, prefixed with its heading context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    /// Set when the splitter had to cut the text at the token limit.
    pub truncated: bool,
}

impl Passage {
    pub fn whole(text: String) -> Self {
        Self {
            text,
            truncated: false,
        }
    }

    pub fn truncated(text: String) -> Self {
        Self {
            text,
            truncated: true,
        }
    }
}

/// One stored passage with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub text: String,
    pub embedding: EmbeddingVector,
}

impl CorpusRecord {
    pub fn new(text: impl Into<String>, embedding: EmbeddingVector) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// A corpus passage scored against a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedResult<'a> {
    pub text: &'a str,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// The system/user message pair sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub system: String,
    pub user: String,
    /// Number of passage blocks packed into `user`.
    pub passages: usize,
}
