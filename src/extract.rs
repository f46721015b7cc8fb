//! Line-pattern extraction of candidate task titles from free text.
//!
//! Recognizes bullet lines (`-`, `*`, `+`, optionally with a `[ ]`/`[x]`
//! box) and numbered lines (`1.` or `1)`). Everything else is ignored.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s+)?(?P<title>.+?)\s*$")
            .expect("item pattern is valid")
    })
}

/// Candidate titles in order of appearance, without exact duplicates
pub fn extract_task_titles(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(|line| item_pattern().captures(line))
        .filter_map(|captures| captures.name("title"))
        .map(|title| title.as_str().trim().to_string())
        .filter(|title| !title.is_empty() && seen.insert(title.clone()))
        .collect()
}
