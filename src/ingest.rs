//! Offline corpus build: pages → sections → passages → embeddings → CSV.
//!
//! Sections are cleaned of citation markup, filtered by length, and split
//! into token-bounded passages before embedding. The corpus file is replaced
//! atomically once every batch has been embedded, so a failed build leaves
//! the previous corpus in place.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use docent_core::clean::{clean_section, keep_section};
use docent_core::models::{CorpusRecord, Passage, Section};
use docent_core::split::Splitter;
use docent_core::tokenizer::Tokenizer;

use crate::config::{ChunkingConfig, Config};
use crate::corpus_file::save_corpus;
use crate::embedding::{create_embedder, Embedder};
use crate::sources::{page_title, parse_page, DocumentSource, FilesystemSource};

/// Passages gathered from a source, plus the counts reported by `docent build`.
#[derive(Debug, Default)]
pub struct BuildPlan {
    pub pages: usize,
    pub sections_found: usize,
    pub sections_kept: usize,
    pub passages: Vec<Passage>,
}

impl BuildPlan {
    pub fn truncated(&self) -> usize {
        self.passages.iter().filter(|p| p.truncated).count()
    }
}

/// Run `docent build`.
pub async fn run_build(config: &Config, dry_run: bool) -> Result<()> {
    let source = FilesystemSource::scan(&config.source)?;
    let splitter = splitter_for(&config.chunking, None)?;
    let plan = collect_passages(&source, &splitter, config.chunking.min_section_chars).await?;

    if dry_run {
        println!("build (dry-run)");
        print_plan(&plan);
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    let records = embed_passages(&plan.passages, embedder.as_ref(), config.embedding.batch_size)
        .await
        .context("Failed to embed passages")?;
    save_corpus(&config.corpus.path, &records)?;

    println!("build");
    print_plan(&plan);
    println!("  embedded records: {}", records.len());
    println!("  corpus: {}", config.corpus.path.display());
    println!("ok");
    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("  pages: {}", plan.pages);
    println!("  sections found: {}", plan.sections_found);
    println!("  sections kept: {}", plan.sections_kept);
    println!("  passages: {}", plan.passages.len());
    println!("  truncated passages: {}", plan.truncated());
}

/// A splitter for the chunking config, optionally overriding the token limit.
pub fn splitter_for(chunking: &ChunkingConfig, max_tokens: Option<usize>) -> Result<Splitter> {
    let tokenizer = Tokenizer::for_model(&chunking.model)?;
    Ok(Splitter::new(
        tokenizer,
        max_tokens.unwrap_or(chunking.max_tokens),
        chunking.max_recursion,
    ))
}

/// Clean, filter, and split sections in document order.
fn prepare_sections(
    sections: Vec<Section>,
    splitter: &Splitter,
    min_section_chars: usize,
) -> (usize, Vec<Passage>) {
    let kept: Vec<Section> = sections
        .into_iter()
        .map(clean_section)
        .filter(|s| keep_section(s, min_section_chars))
        .collect();
    (kept.len(), splitter.split_all(&kept))
}

/// Gather every passage from every page of `source`.
pub async fn collect_passages(
    source: &dyn DocumentSource,
    splitter: &Splitter,
    min_section_chars: usize,
) -> Result<BuildPlan> {
    let mut plan = BuildPlan::default();

    for title in source.titles().await? {
        let sections = source.sections(&title).await?;
        plan.pages += 1;
        plan.sections_found += sections.len();
        let (kept, passages) = prepare_sections(sections, splitter, min_section_chars);
        plan.sections_kept += kept;
        plan.passages.extend(passages);
    }

    info!(
        pages = plan.pages,
        sections = plan.sections_kept,
        passages = plan.passages.len(),
        "collected passages"
    );
    Ok(plan)
}

/// Embed passages in batches of `batch_size`, preserving order.
pub async fn embed_passages(
    passages: &[Passage],
    embedder: &dyn Embedder,
    batch_size: usize,
) -> docent_core::Result<Vec<CorpusRecord>> {
    let mut records = Vec::with_capacity(passages.len());

    for (i, batch) in passages.chunks(batch_size.max(1)).enumerate() {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(docent_core::DocentError::EmbeddingFailed(format!(
                "batch {}: expected {} embeddings, got {}",
                i,
                texts.len(),
                vectors.len()
            )));
        }
        records.extend(
            texts
                .into_iter()
                .zip(vectors)
                .map(|(text, embedding)| CorpusRecord::new(text, embedding)),
        );
        info!(batch = i, embedded = records.len(), total = passages.len(), "embedded batch");
    }

    Ok(records)
}

/// Passages produced for a single page file, as `docent split` shows them.
pub fn split_page(
    path: &Path,
    config: &Config,
    max_tokens: Option<usize>,
) -> Result<Vec<Passage>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page {}", path.display()))?;
    let sections = parse_page(&page_title(path), &text, &config.source.sections_to_ignore);
    let splitter = splitter_for(&config.chunking, max_tokens)?;
    let (_, passages) = prepare_sections(sections, &splitter, config.chunking.min_section_chars);
    Ok(passages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use async_trait::async_trait;
    use docent_core::models::EmbeddingVector;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct LengthEmbedder {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }

        async fn embed(&self, texts: &[String]) -> docent_core::Result<Vec<EmbeddingVector>> {
            self.batches.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn splitter() -> Splitter {
        Splitter::new(Tokenizer::for_model("gpt-3.5-turbo").unwrap(), 1600, 5)
    }

    #[tokio::test]
    async fn test_collect_passages_cleans_and_filters() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("Old_Trafford.wiki"),
            "Old Trafford is a football stadium in Greater Manchester.<ref>Ground guide</ref>\n\
             == Capacity ==\n\
             Tiny.\n\
             == History ==\n\
             The stadium opened in 1910 after a move from Bank Street.\n\
             == References ==\n\
             Lots of references that should never be embedded.\n",
        )
        .unwrap();

        let config = SourceConfig {
            root: tmp.path().to_path_buf(),
            ..SourceConfig::default()
        };
        let source = FilesystemSource::scan(&config).unwrap();
        let plan = collect_passages(&source, &splitter(), 20).await.unwrap();

        assert_eq!(plan.pages, 1);
        assert_eq!(plan.sections_found, 3);
        assert_eq!(plan.sections_kept, 2);
        assert_eq!(plan.passages.len(), 2);
        assert_eq!(
            plan.passages[0].text,
            "Old Trafford\n\nOld Trafford is a football stadium in Greater Manchester."
        );
        assert!(plan.passages[1].text.starts_with("Old Trafford\n\n== History ==\n\n"));
        assert_eq!(plan.truncated(), 0);
    }

    #[tokio::test]
    async fn test_embed_passages_batches_in_order() {
        let passages: Vec<Passage> = (0..5)
            .map(|i| Passage::whole("x".repeat(i + 1)))
            .collect();
        let embedder = LengthEmbedder {
            batches: Mutex::new(Vec::new()),
        };
        let records = embed_passages(&passages, &embedder, 2).await.unwrap();

        assert_eq!(*embedder.batches.lock().unwrap(), vec![2, 2, 1]);
        let lengths: Vec<f32> = records.iter().map(|r| r.embedding[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(records[4].text, "xxxxx");
    }
}
