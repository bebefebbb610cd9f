//! Greedy, token-budgeted prompt assembly.
//!
//! The user message is built as
//!
//! ```text
//! <preamble>
//!
//! <section label>:
//! """
//! <passage 1>
//! """
//! ...
//!
//! Question: <query>
//! ```
//!
//! Passages are appended in ranked order while the whole user message
//! (preamble, blocks so far, question) stays within the token budget. The
//! first passage that would overflow ends the packing; later, smaller
//! passages are not tried.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{PromptMessage, RankedResult};
use crate::tokenizer::Tokenizer;

/// `4096 - 500`: context window of the default chat model minus room for the answer.
pub const DEFAULT_TOKEN_BUDGET: usize = 3596;

/// Fixed text surrounding the retrieved passages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub preamble: String,
    pub section_label: String,
}

impl PromptTemplate {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            system: format!("You answer questions about {}.", domain.trim_end_matches('.')),
            preamble: format!(
                "Use the below articles about {} to answer the subsequent question. \
                 If the answer cannot be found in the articles, write \"I don't know.\"",
                domain
            ),
            section_label: "Wikipedia article section".to_string(),
        }
    }

    pub fn passage_block(&self, passage: &str) -> String {
        format!("\n\n{}:\n\"\"\"\n{}\n\"\"\"", self.section_label, passage)
    }

    pub fn question_block(&self, query: &str) -> String {
        format!("\n\nQuestion: {}", query)
    }
}

/// Pack as many top-ranked passages as fit into `token_budget`.
///
/// If the preamble and question alone exceed the budget, the message holds
/// no passages and is returned as is rather than treated as an error.
pub fn assemble(
    query: &str,
    ranked: &[RankedResult<'_>],
    template: &PromptTemplate,
    tokenizer: &Tokenizer,
    token_budget: usize,
) -> PromptMessage {
    let question = template.question_block(query);
    let mut message = template.preamble.clone();
    let mut passages = 0;

    for result in ranked {
        let block = template.passage_block(result.text);
        let tokens = tokenizer.count(&format!("{}{}{}", message, block, question));
        if tokens > token_budget {
            break;
        }
        message.push_str(&block);
        passages += 1;
    }

    if passages == 0 && !ranked.is_empty() {
        debug!(
            token_budget,
            candidates = ranked.len(),
            "no passage fits the prompt budget"
        );
    }

    message.push_str(&question);
    PromptMessage {
        system: template.system.clone(),
        user: message,
        passages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok() -> Tokenizer {
        Tokenizer::for_model("gpt-3.5-turbo").unwrap()
    }

    fn template() -> PromptTemplate {
        PromptTemplate::for_domain("Manchester United F.C.")
    }

    fn ranked(texts: &[&'static str]) -> Vec<RankedResult<'static>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RankedResult {
                text: t,
                score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    const PASSAGES: [&str; 4] = [
        "History\n\nThe club was founded in 1878 as Newton Heath LYR.",
        "Honours\n\nIn 1999 the club won the treble.",
        "Stadium\n\nOld Trafford holds 74,310 spectators.",
        "Rivalries\n\nThe club's fiercest rivals are Liverpool and Manchester City.",
    ];

    #[test]
    fn test_all_passages_fit() {
        let tok = tok();
        let t = template();
        let msg = assemble("When was the club founded?", &ranked(&PASSAGES), &t, &tok, 4000);
        assert_eq!(msg.passages, 4);
        assert!(msg.user.starts_with(&t.preamble));
        assert!(msg.user.ends_with("\n\nQuestion: When was the club founded?"));
        assert_eq!(msg.system, "You answer questions about Manchester United F.C.");
        let first = msg.user.find("Newton Heath").unwrap();
        let second = msg.user.find("treble").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_budget_below_base_yields_no_passages() {
        let tok = tok();
        let msg = assemble("When was the club founded?", &ranked(&PASSAGES), &template(), &tok, 5);
        assert_eq!(msg.passages, 0);
        assert!(!msg.user.contains("\"\"\""));
        assert!(msg.user.ends_with("Question: When was the club founded?"));
    }

    #[test]
    fn test_output_within_budget() {
        let tok = tok();
        let t = template();
        let base = tok.count(&format!("{}{}", t.preamble, t.question_block("Who?")));
        for budget in (base..base + 200).step_by(7) {
            let msg = assemble("Who?", &ranked(&PASSAGES), &t, &tok, budget);
            assert!(tok.count(&msg.user) <= budget);
        }
    }

    #[test]
    fn test_larger_budget_only_adds_passages() {
        let tok = tok();
        let t = template();
        let input = ranked(&PASSAGES);
        let mut previous = 0;
        for budget in (0..400).step_by(5) {
            let msg = assemble("Who?", &input, &t, &tok, budget);
            assert!(msg.passages >= previous);
            for text in &PASSAGES[..msg.passages] {
                assert!(msg.user.contains(text));
            }
            previous = msg.passages;
        }
        assert_eq!(previous, PASSAGES.len());
    }

    #[test]
    fn test_stops_at_first_overflow() {
        let tok = tok();
        let t = template();
        let huge: &'static str = Box::leak("lorem ipsum ".repeat(2000).into_boxed_str());
        let input = ranked(&[PASSAGES[0], huge, PASSAGES[1]]);
        let msg = assemble("Who?", &input, &t, &tok, 500);
        assert_eq!(msg.passages, 1);
        assert!(msg.user.contains("Newton Heath"));
        assert!(!msg.user.contains("treble"));
    }

    #[test]
    fn test_empty_ranking() {
        let tok = tok();
        let msg = assemble("Who?", &[], &template(), &tok, 1000);
        assert_eq!(msg.passages, 0);
    }
}
