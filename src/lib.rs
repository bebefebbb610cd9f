//! # Docent
//!
//! Retrieval-augmented question answering over a fixed corpus of
//! encyclopedia-style pages.
//!
//! Offline, `docent build` splits pages into token-bounded passages, embeds
//! them, and writes a corpus CSV. Online, each question is embedded, ranked
//! against the corpus by cosine similarity, packed into a token-budgeted
//! prompt, and answered by a chat completion model.
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐
//! │  Pages   │──▶│ Clean+Split  │──▶│ Corpus CSV │
//! │ wiki/md  │   │   +Embed     │   │ text,emb   │
//! └──────────┘   └──────────────┘   └─────┬──────┘
//!                                         │
//!                 ┌───────────────────────┤
//!                 ▼                       ▼
//!            ┌──────────┐           ┌──────────┐
//!            │   CLI    │           │   HTTP   │
//!            │ (docent) │           │  /ask    │
//!            └──────────┘           └──────────┘
//! ```
//!
//! The network-free parts (tokenizer, splitter, ranker, prompt assembly)
//! live in [`docent_core`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`sources`] | Page sources and section parsing |
//! | [`ingest`] | Offline corpus build |
//! | [`corpus_file`] | Corpus CSV load/save |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Chat completion providers |
//! | [`answer`] | Query pipeline |
//! | [`search`] | `search` and `ask` commands |
//! | [`stats`] | `stats` command |
//! | [`server`] | HTTP server |

pub mod answer;
pub mod completion;
pub mod config;
pub mod corpus_file;
pub mod embedding;
pub mod ingest;
mod openai;
pub mod search;
pub mod server;
pub mod sources;
pub mod stats;
