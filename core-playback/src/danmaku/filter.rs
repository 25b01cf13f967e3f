//! Comment block rules.
//!
//! Users type rules as free text, one per line or comma separated. A rule is
//! a case-insensitive keyword, or a case-insensitive regular expression when
//! written as `regex:pattern`, `re:pattern` or `/pattern/`.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use tracing::warn;

/// One compiled block rule.
#[derive(Debug, Clone)]
pub enum BlockRule {
    /// Lower-cased substring.
    Keyword(String),
    Pattern(Regex),
}

impl BlockRule {
    /// Parses a single trimmed rule. Returns `None` for an empty rule or an
    /// invalid pattern.
    pub fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return None;
        }

        let Some(pattern) = regex_body(rule) else {
            return Some(BlockRule::Keyword(rule.to_lowercase()));
        };
        if pattern.is_empty() {
            return None;
        }

        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(BlockRule::Pattern(regex)),
            Err(e) => {
                warn!(rule = %rule, error = %e, "Skipping invalid comment block pattern");
                None
            }
        }
    }

    fn matches(&self, text: &str, lowered: &str) -> bool {
        match self {
            BlockRule::Keyword(keyword) => lowered.contains(keyword.as_str()),
            BlockRule::Pattern(regex) => regex.is_match(text),
        }
    }
}

fn regex_body(rule: &str) -> Option<&str> {
    if let Some(body) = rule.strip_prefix("regex:") {
        return Some(body.trim());
    }
    if let Some(body) = rule.strip_prefix("re:") {
        return Some(body.trim());
    }
    if rule.len() >= 2 && rule.starts_with('/') && rule.ends_with('/') {
        return Some(&rule[1..rule.len() - 1]);
    }
    None
}

/// Splits free-text rules on newlines and commas, trimming and de-duplicating.
pub fn split_rules<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .flat_map(|chunk| chunk.as_ref().split(['\n', ',']))
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .filter(|rule| seen.insert(rule.to_string()))
        .map(str::to_string)
        .collect()
}

/// Compiled set of block rules applied to every emitted comment.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    rules: Vec<BlockRule>,
}

impl CommentFilter {
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Self {
        let rules = split_rules(raw)
            .iter()
            .filter_map(|rule| BlockRule::parse(rule))
            .collect();
        Self { rules }
    }

    pub fn is_blocked(&self, text: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        self.rules.iter().any(|rule| rule.matches(text, &lowered))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
