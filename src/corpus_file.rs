//! Corpus persistence as a two-column CSV file.
//!
//! ```text
//! text,embedding
//! "Old Trafford\n\nCapacity\n\n...","[0.0123,-0.0456,...]"
//! ```
//!
//! Embedding cells are bracketed, comma-separated float lists (JSON array
//! syntax). The file is loaded wholesale at startup; any malformed row fails
//! the whole load with [`DocentError::CorpusLoadFailed`]. Writes go to a
//! temporary sibling file that is renamed over the target, so a serving
//! process never observes a half-written corpus.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use docent_core::corpus::CorpusStore;
use docent_core::models::{CorpusRecord, EmbeddingVector};
use docent_core::{DocentError, Result};
use tracing::info;

const HEADER: [&str; 2] = ["text", "embedding"];

/// Load the corpus file at `path`.
pub fn load_corpus(path: &Path) -> Result<CorpusStore> {
    let label = path.display().to_string();
    let file = fs::File::open(path).map_err(|e| DocentError::corpus(&label, e.to_string()))?;
    let store = read_corpus(file, &label)?;
    info!(path = %label, records = store.len(), dims = store.dims(), "corpus loaded");
    Ok(store)
}

/// Parse a corpus from any reader. `label` names the source in errors.
pub fn read_corpus<R: Read>(reader: R, label: &str) -> Result<CorpusStore> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| DocentError::corpus(label, format!("unreadable header: {}", e)))?;
    if headers.iter().collect::<Vec<_>>() != HEADER {
        return Err(DocentError::corpus(
            label,
            format!(
                "expected header 'text,embedding', found '{}'",
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ));
    }

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let n = i + 1;
        let row = row.map_err(|e| DocentError::corpus(label, format!("record {}: {}", n, e)))?;
        let (text, cell) = match (row.get(0), row.get(1)) {
            (Some(text), Some(cell)) => (text, cell),
            _ => return Err(DocentError::corpus(label, format!("record {}: missing column", n))),
        };
        let embedding = parse_embedding(cell)
            .map_err(|reason| DocentError::corpus(label, format!("record {}: {}", n, reason)))?;
        records.push(CorpusRecord::new(text, embedding));
    }

    CorpusStore::new(records).map_err(|e| DocentError::corpus(label, e.to_string()))
}

/// Parse an embedding cell such as `[0.1, -0.2, 3e-4]`.
pub fn parse_embedding(cell: &str) -> std::result::Result<EmbeddingVector, String> {
    let values: Vec<f32> = serde_json::from_str(cell.trim())
        .map_err(|e| format!("malformed embedding '{}': {}", preview(cell), e))?;
    if values.is_empty() {
        return Err("empty embedding".to_string());
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("embedding contains non-finite values".to_string());
    }
    Ok(values)
}

/// Serialize an embedding as a bracketed list.
pub fn format_embedding(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Write `records` to `path`, replacing any existing corpus atomically.
pub fn save_corpus(path: &Path, records: &[CorpusRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp = temp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        wtr.write_record(HEADER)?;
        for record in records {
            let cell = format_embedding(&record.embedding);
            wtr.write_record([record.text.as_str(), cell.as_str()])?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "corpus.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn preview(cell: &str) -> String {
    let short: String = cell.chars().take(40).collect();
    if short.len() < cell.len() {
        format!("{}...", short)
    } else {
        short
    }
}
