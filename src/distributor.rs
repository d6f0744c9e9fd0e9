//! Strategies that derive a section map from a session buffer.
//!
//! Distributors are pure functions of the whole buffer. The controller re-runs
//! them from scratch after every content frame, so a heading that arrives split
//! across two chunks is still recognized once its line completes.

use std::fmt;
use std::sync::OnceLock;

use emojis::get as emoji_get;
use regex::Regex;

use crate::sections::SectionMap;

/// Section key produced by [`SingleSlot`].
pub const DEFAULT_SECTION: &str = "default";

pub trait SectionDistributor: fmt::Debug + Send + Sync {
    /// Keys this distributor produces, in display order.
    fn section_keys(&self) -> Vec<String>;

    fn classify(&self, buffer: &str) -> SectionMap;
}

/// The whole buffer is one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleSlot;

impl SectionDistributor for SingleSlot {
    fn section_keys(&self) -> Vec<String> {
        vec![DEFAULT_SECTION.to_string()]
    }

    fn classify(&self, buffer: &str) -> SectionMap {
        [(DEFAULT_SECTION, buffer)].into_iter().collect()
    }
}

/// How a line is compared against a heading sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadingMatch {
    /// The line contains the sentinel's text fragment anywhere.
    #[default]
    Contains,
    /// After markdown markers and a leading symbol are stripped, the line
    /// starts with the fragment, ignoring case.
    Anchored,
}

/// One heading sentinel and the section key it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    sentinel: String,
    key: String,
    fragment: String,
}

impl Heading {
    #[must_use]
    pub fn new(sentinel: impl Into<String>, key: impl Into<String>) -> Self {
        let sentinel = sentinel.into();
        let fragment = text_fragment(&sentinel).to_string();

        Self {
            sentinel,
            key: key.into(),
            fragment,
        }
    }

    #[must_use]
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Recognizable text of the sentinel, without its leading emoji.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    fn matches(&self, line: &str, mode: HeadingMatch) -> bool {
        if self.fragment.is_empty() {
            return line.trim() == self.sentinel.trim();
        }

        match mode {
            HeadingMatch::Contains => line.contains(&self.fragment),
            HeadingMatch::Anchored => {
                let stripped = strip_heading_markup(line);
                stripped
                    .get(..self.fragment.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.fragment))
            }
        }
    }
}

/// Buckets lines under the most recent matching heading.
///
/// Heading lines themselves are not copied into any section, and lines before
/// the first heading are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingClassified {
    headings: Vec<Heading>,
    mode: HeadingMatch,
}

impl HeadingClassified {
    #[must_use]
    pub fn new(headings: impl IntoIterator<Item = Heading>) -> Self {
        Self {
            headings: headings.into_iter().collect(),
            mode: HeadingMatch::default(),
        }
    }

    #[must_use]
    pub fn with_match(mut self, mode: HeadingMatch) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    #[must_use]
    pub fn match_mode(&self) -> HeadingMatch {
        self.mode
    }

    fn heading_index(&self, line: &str) -> Option<usize> {
        self.headings
            .iter()
            .position(|heading| heading.matches(line, self.mode))
    }
}

impl SectionDistributor for HeadingClassified {
    fn section_keys(&self) -> Vec<String> {
        self.headings
            .iter()
            .map(|heading| heading.key.clone())
            .collect()
    }

    fn classify(&self, buffer: &str) -> SectionMap {
        let mut sections = SectionMap::empty_for(self.headings.iter().map(Heading::key));
        let mut current: Option<usize> = None;

        for line in buffer.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);

            if let Some(index) = self.heading_index(content) {
                current = Some(index);
                continue;
            }

            if let Some(index) = current {
                sections.push_str(&self.headings[index].key, line);
            }
        }

        sections
    }
}

fn heading_markup_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^\s*(?:#{1,6}\s*|\*\*|__|>\s*|[-*+]\s+|\d+[.)]\s+)*")
            .expect("heading markup regex must compile")
    })
}

fn strip_heading_markup(line: &str) -> &str {
    let line = &line[heading_markup_regex().find(line).map_or(0, |found| found.end())..];
    let line = text_fragment(line);
    let line = line.trim_start_matches(['*', '_']);
    line.trim_start()
}

/// Drop a leading emoji or symbol token: `"🧠 The Core Idea"` -> `"The Core Idea"`.
fn text_fragment(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some((first, rest)) = trimmed.split_once(char::is_whitespace) {
        if is_symbol_token(first) {
            return rest.trim_start();
        }
    }

    trimmed.trim_start_matches(|ch: char| !ch.is_alphanumeric() && !is_markup(ch))
}

fn is_symbol_token(token: &str) -> bool {
    emoji_get(token).is_some() || !token.chars().any(char::is_alphanumeric)
}

fn is_markup(ch: char) -> bool {
    matches!(ch, '*' | '_' | '#' | '`' | '[' | '(')
}
