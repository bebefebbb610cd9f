//! Token-budgeted recursive splitter.
//!
//! Turns one [`Section`] into [`Passage`]s that each fit within
//! `max_tokens`, keeping the heading path in front of every piece.
//!
//! # Algorithm
//!
//! 1. Join headings and body. If the result fits, it is the only passage.
//! 2. If the recursion budget is spent, truncate the joined string to
//!    `max_tokens` tokens and emit it (logged at `warn`).
//! 3. Otherwise bisect the body on the first delimiter of the cascade
//!    (paragraph break, line break, sentence period) that yields two
//!    non-empty halves, choosing the chunk boundary closest to the token
//!    midpoint (see [`best_split_point`]).
//! 4. Recurse into each half with one less level of recursion and emit the
//!    left passages before the right ones.
//! 5. If no delimiter produces a bisection, truncate as in step 2.
//!
//! Paragraph and line breaks are dropped at the cut; a sentence period stays
//! with the left half.
//!
//! # Example
//!
//! ```rust
//! use docent_core::models::{HeadingPath, Section};
//! use docent_core::split::Splitter;
//! use docent_core::tokenizer::Tokenizer;
//!
//! let tok = Tokenizer::for_model("gpt-3.5-turbo").unwrap();
//! let splitter = Splitter::new(tok, 1000, 5);
//! let section = Section::new(HeadingPath::root("Old Trafford"), "It seats 74,310.");
//! let passages = splitter.split(&section);
//! assert_eq!(passages.len(), 1);
//! assert_eq!(passages[0].text, "Old Trafford\n\nIt seats 74,310.");
//! ```

use tracing::warn;

use crate::models::{HeadingPath, Passage, Section};
use crate::tokenizer::Tokenizer;

pub const DEFAULT_MAX_TOKENS: usize = 1000;
pub const DEFAULT_MAX_RECURSION: usize = 5;

/// A boundary the splitter may cut on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub pattern: &'static str,
    /// Re-attach the delimiter to the end of the left half.
    pub keep_left: bool,
}

/// Delimiters tried in order, coarsest first.
pub const DELIMITER_CASCADE: [Delimiter; 3] = [
    Delimiter {
        pattern: "\n\n",
        keep_left: false,
    },
    Delimiter {
        pattern: "\n",
        keep_left: false,
    },
    Delimiter {
        pattern: ".",
        keep_left: true,
    },
];

/// Choose where to cut a run of chunks so the left side is closest to `halfway` tokens.
///
/// `left_tokens(n)` returns the token count of the first `n` chunks joined
/// by their delimiter. Token counts are assumed non-decreasing in `n`.
///
/// The scan adds one chunk at a time and stops at the first index whose
/// inclusion does not bring the left side strictly closer to `halfway`.
/// The returned index `i` means left = `chunks[..i]`, right = `chunks[i..]`;
/// it is `0` when even the first chunk overshoots, and at most
/// `num_chunks - 1`.
pub fn best_split_point<F>(num_chunks: usize, halfway: usize, mut left_tokens: F) -> usize
where
    F: FnMut(usize) -> usize,
{
    let mut best_diff = halfway;
    for i in 0..num_chunks {
        let diff = halfway.abs_diff(left_tokens(i + 1));
        if diff >= best_diff {
            return i;
        }
        best_diff = diff;
    }
    num_chunks.saturating_sub(1)
}

/// Splits sections into token-bounded passages.
#[derive(Debug, Clone)]
pub struct Splitter {
    tokenizer: Tokenizer,
    max_tokens: usize,
    max_recursion: usize,
}

impl Splitter {
    pub fn new(tokenizer: Tokenizer, max_tokens: usize, max_recursion: usize) -> Self {
        Self {
            tokenizer,
            max_tokens,
            max_recursion,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Split one section into passages, in document order.
    pub fn split(&self, section: &Section) -> Vec<Passage> {
        let mut out = Vec::new();
        self.split_into(&section.headings, &section.body, self.max_recursion, &mut out);
        out
    }

    /// Split every section, concatenating the results.
    pub fn split_all<'a, I>(&self, sections: I) -> Vec<Passage>
    where
        I: IntoIterator<Item = &'a Section>,
    {
        sections.into_iter().flat_map(|s| self.split(s)).collect()
    }

    fn split_into(
        &self,
        headings: &HeadingPath,
        body: &str,
        depth_left: usize,
        out: &mut Vec<Passage>,
    ) {
        let candidate = headings.join_with(body);
        if self.tokenizer.count(&candidate) <= self.max_tokens {
            out.push(Passage::whole(candidate));
            return;
        }

        if depth_left > 0 {
            for delimiter in DELIMITER_CASCADE {
                if let Some((left, right)) = self.halve(body, delimiter) {
                    self.split_into(headings, &left, depth_left - 1, out);
                    self.split_into(headings, &right, depth_left - 1, out);
                    return;
                }
            }
        }

        out.push(self.truncate(headings, &candidate));
    }

    /// Bisect `text` on `delimiter`, balancing tokens. `None` if either half is empty.
    fn halve(&self, text: &str, delimiter: Delimiter) -> Option<(String, String)> {
        let chunks: Vec<&str> = text.split(delimiter.pattern).collect();
        let (mut left, right) = match chunks.len() {
            0 | 1 => return None,
            2 => (chunks[0].to_string(), chunks[1].to_string()),
            n => {
                let halfway = self.tokenizer.count(text) / 2;
                let at = best_split_point(n, halfway, |k| {
                    self.tokenizer.count(&chunks[..k].join(delimiter.pattern))
                });
                (
                    chunks[..at].join(delimiter.pattern),
                    chunks[at..].join(delimiter.pattern),
                )
            }
        };

        if left.is_empty() || right.is_empty() {
            return None;
        }
        if delimiter.keep_left {
            left.push_str(delimiter.pattern);
        }
        Some((left, right))
    }

    fn truncate(&self, headings: &HeadingPath, candidate: &str) -> Passage {
        let cut = self.tokenizer.truncate(candidate, self.max_tokens);
        warn!(
            title = headings.title().unwrap_or(""),
            from_tokens = cut.original_tokens,
            to_tokens = cut.kept_tokens,
            "passage truncated to token limit"
        );
        Passage::truncated(cut.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok() -> Tokenizer {
        Tokenizer::for_model("gpt-3.5-turbo").unwrap()
    }

    fn heading() -> HeadingPath {
        HeadingPath::root("Manchester United F.C.").child("== History ==")
    }

    /// Build a paragraph of distinct sentences with at least `min_tokens` tokens.
    fn paragraph(tok: &Tokenizer, tag: &str, min_tokens: usize) -> String {
        let mut text = String::new();
        let mut i = 0;
        while tok.count(&text) < min_tokens {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!(
                "In season {} of the {} era the club played another league match.",
                i, tag
            ));
            i += 1;
        }
        text
    }

    #[test]
    fn test_best_split_point_balanced() {
        // chunk sizes 10, 10, 10, 10 → cut after two chunks
        let at = best_split_point(4, 20, |n| n * 10);
        assert_eq!(at, 2);
    }

    #[test]
    fn test_best_split_point_first_chunk_overshoots() {
        // first chunk already twice the midpoint
        let at = best_split_point(3, 10, |n| [20, 25, 30][n - 1]);
        assert_eq!(at, 0);
    }

    #[test]
    fn test_best_split_point_tie_stops() {
        // |10-5| = 5, |10-15| = 5 → tie stops at index 1
        let at = best_split_point(3, 10, |n| [5, 15, 20][n - 1]);
        assert_eq!(at, 1);
    }

    #[test]
    fn test_best_split_point_never_past_last() {
        let at = best_split_point(3, 1000, |n| n);
        assert_eq!(at, 2);
    }

    #[test]
    fn test_short_section_single_passage() {
        let splitter = Splitter::new(tok(), 1000, 5);
        let section = Section::new(heading(), "Founded in 1878 as Newton Heath LYR.");
        let passages = splitter.split(&section);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, section.joined());
        assert!(!passages[0].truncated);
    }

    #[test]
    fn test_three_paragraphs_over_budget() {
        let tok = tok();
        let body = [
            paragraph(&tok, "first", 830),
            paragraph(&tok, "second", 830),
            paragraph(&tok, "third", 830),
        ]
        .join("\n\n");
        let section = Section::new(heading(), body);
        assert!(tok.count(&section.joined()) > 2400);

        let splitter = Splitter::new(tok.clone(), 1000, 5);
        let passages = splitter.split(&section);
        assert!(
            (2..=3).contains(&passages.len()),
            "got {} passages",
            passages.len()
        );
        let prefix = heading().join_with("");
        for p in &passages {
            assert!(tok.count(&p.text) <= 1000);
            assert!(p.text.starts_with(&prefix));
            assert!(!p.truncated);
        }
    }

    #[test]
    fn test_passages_within_budget_or_truncated() {
        let tok = tok();
        let body = (0..120)
            .map(|i| format!("Line {} describes a match\nwith a second line {}.", i, i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let section = Section::new(heading(), body);
        let splitter = Splitter::new(tok.clone(), 200, 5);
        let passages = splitter.split(&section);
        assert!(passages.len() > 1);
        for p in &passages {
            assert!(tok.count(&p.text) <= 200, "{} tokens", tok.count(&p.text));
        }
    }

    #[test]
    fn test_no_delimiters_truncates() {
        let tok = tok();
        let body = " token".repeat(100_000);
        let section = Section::new(heading(), body);
        let splitter = Splitter::new(tok.clone(), 1000, 5);
        let passages = splitter.split(&section);
        assert_eq!(passages.len(), 1);
        assert!(passages[0].truncated);
        assert!(tok.count(&passages[0].text) <= 1000);
        assert!(passages[0].text.starts_with(&heading().join_with("")));
    }

    #[test]
    fn test_recursion_depth_bounds_output() {
        let tok = tok();
        let body = (0..400)
            .map(|i| format!("Sentence number {} about the club", i))
            .collect::<Vec<_>>()
            .join("\n");
        let section = Section::new(heading(), body);
        let splitter = Splitter::new(tok.clone(), 30, 3);
        let passages = splitter.split(&section);
        assert!(passages.len() <= 1 << 3);
        assert!(passages.iter().any(|p| p.truncated));
        for p in &passages {
            assert!(tok.count(&p.text) <= 30);
        }
    }

    #[test]
    fn test_split_preserves_body_text() {
        let tok = tok();
        let body = (0..12)
            .map(|p| {
                (0..4)
                    .map(|s| format!("Paragraph {} sentence {} mentions the treble.", p, s))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let section = Section::new(heading(), body.clone());
        let splitter = Splitter::new(tok, 60, 10);
        let passages = splitter.split(&section);
        assert!(passages.len() > 1);

        let prefix = heading().join_with("");
        let mut rebuilt = String::new();
        for p in &passages {
            assert!(!p.truncated);
            rebuilt.push_str(p.text.strip_prefix(&prefix).unwrap());
        }
        let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(squash(&rebuilt), squash(&body));
    }

    #[test]
    fn test_sentence_delimiter_keeps_period_left() {
        let splitter = Splitter::new(tok(), 1000, 5);
        let delim = DELIMITER_CASCADE[2];
        let (left, right) = splitter.halve("First part. Second part", delim).unwrap();
        assert_eq!(left, "First part.");
        assert_eq!(right, " Second part");
    }

    #[test]
    fn test_halve_rejects_empty_half() {
        let splitter = Splitter::new(tok(), 1000, 5);
        assert!(splitter.halve("no breaks here", DELIMITER_CASCADE[0]).is_none());
        assert!(splitter.halve("ends with a period.", DELIMITER_CASCADE[2]).is_none());
    }

    #[test]
    fn test_split_all_keeps_order() {
        let splitter = Splitter::new(tok(), 1000, 5);
        let a = Section::new(HeadingPath::root("A"), "alpha body");
        let b = Section::new(HeadingPath::root("B"), "beta body");
        let passages = splitter.split_all([&a, &b]);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "A\n\nalpha body");
        assert_eq!(passages[1].text, "B\n\nbeta body");
    }
}
