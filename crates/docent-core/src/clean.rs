//! Ingestion-time cleanup applied to sections before splitting.

use crate::models::Section;

/// Sections shorter than this many characters are treated as noise.
pub const DEFAULT_MIN_SECTION_CHARS: usize = 20;

/// Strip citation markup and surrounding whitespace from a section body.
pub fn clean_section(section: Section) -> Section {
    let body = strip_refs(&section.body).trim().to_string();
    Section {
        headings: section.headings,
        body,
    }
}

/// True if the section has enough body text to be worth storing.
pub fn keep_section(section: &Section, min_chars: usize) -> bool {
    section.body.chars().count() >= min_chars
}

/// Remove `<ref>…</ref>` pairs and self-closing `<ref …/>` tags.
///
/// A pair only matches within a single line, up to the first closing tag.
/// Unterminated tags are left in place.
pub fn strip_refs(text: &str) -> String {
    const OPEN: &str = "<ref";
    const CLOSE: &str = "</ref>";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let line = &tail[..tail.find('\n').unwrap_or(tail.len())];

        let self_closing = line
            .find('>')
            .filter(|&gt| line[..gt].ends_with('/'))
            .map(|gt| gt + 1);
        let paired = line.find(CLOSE).map(|end| end + CLOSE.len());

        match self_closing.or(paired) {
            Some(consumed) => rest = &tail[consumed..],
            None => {
                out.push_str(OPEN);
                rest = &tail[OPEN.len()..];
            }
        }
    }
    out.push_str(rest);
    out
}
