//! `docent search` and `docent ask`.

use std::sync::Arc;

use anyhow::Result;

use crate::answer::Answerer;
use crate::config::Config;
use crate::corpus_file::load_corpus;

fn answerer(config: &Config) -> Result<Answerer> {
    let corpus = load_corpus(&config.corpus.path)?;
    Answerer::from_config(config, Arc::new(corpus))
}

/// Print the passages most similar to `query`.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let answerer = answerer(config)?;
    let limit = limit.unwrap_or(config.retrieval.top_n);
    let hits = answerer.search(query, limit).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let mut lines = hit.text.lines().filter(|l| !l.trim().is_empty());
        let heading = lines.next().unwrap_or("(empty)");
        let excerpt: String = lines.collect::<Vec<_>>().join(" ");
        println!("{}. [{:.3}] {}", i + 1, hit.score, heading);
        println!("    excerpt: \"{}\"", excerpt_of(&excerpt, 160));
        println!();
    }
    Ok(())
}

/// Answer `question`, optionally printing the prompt the answer was
/// completed from.
///
/// Config, corpus, and credential problems fail the command. A failure while
/// answering prints the configured apology, as the HTTP front end does.
pub async fn run_ask(config: &Config, question: &str, show_prompt: bool) -> Result<()> {
    let answerer = answerer(config)?;

    match answerer.ask_with_prompt(question).await {
        Ok((message, answer)) => {
            if show_prompt {
                println!("--- system ---");
                println!("{}", message.system);
                println!("--- user ({} passages) ---", message.passages);
                println!("{}", message.user);
                println!("--- answer ---");
            }
            println!("{}", answer.text);
        }
        Err(e) => println!("{}", answerer.apologize(&e)),
    }
    Ok(())
}

fn excerpt_of(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
