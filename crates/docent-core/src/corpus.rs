//! In-memory corpus of passages and their embeddings.
//!
//! Built once (offline ingestion or a wholesale file load) and read-only
//! afterwards. Share it between concurrent queries behind an `Arc`.

use crate::error::{DocentError, Result};
use crate::models::{CorpusRecord, RankedResult};
use crate::rank;

#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    records: Vec<CorpusRecord>,
    dims: usize,
}

impl CorpusStore {
    /// Build a store, checking that every embedding has the same dimensionality.
    pub fn new(records: Vec<CorpusRecord>) -> Result<Self> {
        let dims = records.first().map(|r| r.embedding.len()).unwrap_or(0);
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dims) {
            return Err(DocentError::DimensionMismatch {
                expected: dims,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self { records, dims })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimensionality, `0` for an empty store.
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorpusRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CorpusRecord> {
        self.records
    }

    /// Rank every passage against `query`; see [`rank::rank`].
    pub fn rank(&self, query: &[f32], top_n: usize) -> Result<Vec<RankedResult<'_>>> {
        rank::rank(query, self, top_n)
    }
}
