//! Document sources: where the offline build gets its sections from.
//!
//! A [`DocumentSource`] lists page titles within a category tree and turns
//! one page into [`Section`]s. The built-in [`FilesystemSource`] reads a
//! directory tree in which every subdirectory is a subcategory and every
//! file is a page, written in wikitext (`== Heading ==`) or Markdown
//! (`## Heading`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use docent_core::models::{HeadingPath, Section};

use crate::config::SourceConfig;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Titles of all pages in the category tree, up to the configured depth.
    async fn titles(&self) -> Result<Vec<String>>;

    /// All sections of one page, summary first, in document order.
    async fn sections(&self, title: &str) -> Result<Vec<Section>>;
}

/// Pages stored as files under a root directory.
pub struct FilesystemSource {
    pages: BTreeMap<String, PathBuf>,
    sections_to_ignore: Vec<String>,
}

impl FilesystemSource {
    /// Walk `config.root`, descending at most `config.max_depth` subcategory levels.
    pub fn scan(config: &SourceConfig) -> Result<Self> {
        let root = &config.root;
        if !root.is_dir() {
            bail!("Source root does not exist: {}", root.display());
        }

        let include_set = build_globset(&config.include_globs)?;
        let mut excludes = vec!["**/.git/**".to_string()];
        excludes.extend(config.exclude_globs.clone());
        let exclude_set = build_globset(&excludes)?;

        let mut pages = BTreeMap::new();
        let walker = WalkDir::new(root)
            .max_depth(config.max_depth + 1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();
            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            let title = page_title(path);
            pages.entry(title).or_insert_with(|| path.to_path_buf());
        }

        Ok(Self {
            pages,
            sections_to_ignore: config.sections_to_ignore.clone(),
        })
    }
}

#[async_trait]
impl DocumentSource for FilesystemSource {
    async fn titles(&self) -> Result<Vec<String>> {
        Ok(self.pages.keys().cloned().collect())
    }

    async fn sections(&self, title: &str) -> Result<Vec<Section>> {
        let path = self
            .pages
            .get(title)
            .ok_or_else(|| anyhow::anyhow!("Page not found: {}", title))?;
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read page {}", path.display()))?;
        Ok(parse_page(title, &text, &self.sections_to_ignore))
    }
}

/// Page title from a file name: the stem, with underscores as spaces.
pub(crate) fn page_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_default()
}

/// A heading line: its nesting level, raw text, and bare name.
#[derive(Debug, PartialEq, Eq)]
struct Heading<'a> {
    level: usize,
    raw: &'a str,
    name: &'a str,
}

fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let raw = line.trim();

    if raw.starts_with('=') && raw.ends_with('=') {
        let open = raw.len() - raw.trim_start_matches('=').len();
        let close = raw.len() - raw.trim_end_matches('=').len();
        let level = open.min(close);
        if raw.len() <= open + close {
            return None;
        }
        let name = raw[open..raw.len() - close].trim();
        return (!name.is_empty()).then_some(Heading { level, raw, name });
    }

    if raw.starts_with('#') {
        let level = raw.len() - raw.trim_start_matches('#').len();
        let rest = &raw[level..];
        if level <= 6 && rest.starts_with(' ') {
            let name = rest.trim().trim_end_matches('#').trim();
            return (!name.is_empty()).then_some(Heading { level, raw, name });
        }
    }

    None
}

/// Split page text into sections.
///
/// Text before the first heading is the summary section, headed by the
/// title alone. Every heading starts a section whose heading path is the
/// title plus the chain of enclosing headings; its body runs to the next
/// heading of any level. Headings named in `ignore` are dropped together
/// with everything nested under them.
pub fn parse_page(title: &str, text: &str, ignore: &[String]) -> Vec<Section> {
    let root = HeadingPath::root(title);
    let mut sections = Vec::new();

    let mut stack: Vec<(usize, &str)> = Vec::new();
    let mut skip_below: Option<usize> = None;
    let mut current = Some(root.clone());
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        let Some(heading) = parse_heading(line) else {
            body.push(line);
            continue;
        };

        if let Some(path) = current.take() {
            sections.push(Section::new(path, body.join("\n")));
        }
        body.clear();

        if skip_below.is_some_and(|level| heading.level > level) {
            continue;
        }
        skip_below = None;

        while stack.last().is_some_and(|&(level, _)| level >= heading.level) {
            stack.pop();
        }

        if ignore.iter().any(|name| name.eq_ignore_ascii_case(heading.name)) {
            skip_below = Some(heading.level);
            continue;
        }

        stack.push((heading.level, heading.raw));
        let path = stack.iter().fold(root.clone(), |p, &(_, raw)| p.child(raw));
        current = Some(path);
    }

    if let Some(path) = current {
        sections.push(Section::new(path, body.join("\n")));
    }
    sections
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
