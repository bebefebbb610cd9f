//! # docent core
//!
//! Network-free retrieval pipeline for docent:
//!
//! ```text
//! offline:  Section ──▶ split ──▶ Passage ──(embed)──▶ CorpusRecord ──▶ CorpusStore
//! online:   query ──(embed)──▶ rank(CorpusStore) ──▶ assemble ──▶ PromptMessage
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tokenizer`] | Model-specific token count / encode / decode |
//! | [`split`] | Token-budgeted recursive splitter |
//! | [`clean`] | Citation stripping and short-section filtering |
//! | [`corpus`] | Immutable in-memory corpus store |
//! | [`rank`] | Cosine-similarity relevance ranking |
//! | [`prompt`] | Greedy token-budgeted prompt assembly |
//! | [`models`] | Data types shared by every stage |
//! | [`error`] | Error taxonomy |
//!
//! Embedding and completion providers, persistence, and front ends live in
//! the `docent` application crate.

pub mod clean;
pub mod corpus;
pub mod error;
pub mod models;
pub mod prompt;
pub mod rank;
pub mod split;
pub mod tokenizer;

pub use error::{DocentError, Result};
