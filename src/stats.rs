//! `docent stats`: a quick summary of the persisted corpus.

use anyhow::Result;

use docent_core::tokenizer::Tokenizer;

use crate::config::Config;
use crate::corpus_file::load_corpus;

pub fn run_stats(config: &Config) -> Result<()> {
    let corpus = load_corpus(&config.corpus.path)?;
    let tokenizer = Tokenizer::for_model(&config.chunking.model)?;

    let file_size = std::fs::metadata(&config.corpus.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let token_counts: Vec<usize> = corpus.iter().map(|r| tokenizer.count(&r.text)).collect();
    let total_tokens: usize = token_counts.iter().sum();
    let max_tokens = token_counts.iter().copied().max().unwrap_or(0);
    let avg_tokens = if token_counts.is_empty() {
        0
    } else {
        total_tokens / token_counts.len()
    };

    println!("Docent Corpus Stats");
    println!("===================");
    println!();
    println!("  Corpus:      {}", config.corpus.path.display());
    println!("  Size:        {}", format_bytes(file_size));
    println!();
    println!("  Passages:    {}", corpus.len());
    println!("  Dimensions:  {}", corpus.dims());
    println!("  Tokens:      {} total, {} avg, {} max", total_tokens, avg_tokens, max_tokens);
    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
