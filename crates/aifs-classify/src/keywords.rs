//! Keyword extraction for rule matching and rule proposals.

use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "and", "are", "been", "but", "can", "could", "did", "does", "for",
    "from", "had", "has", "have", "her", "his", "how", "into", "its", "just", "more", "not",
    "one", "our", "out", "over", "she", "should", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "was",
    "were", "what", "when", "where", "which", "while", "who", "will", "with", "would", "you",
    "your",
];

const MAX_TOKEN_CHARS: usize = 40;

/// The `limit` most frequent content words in `text`, lowercased, most
/// frequent first (ties broken alphabetically).
pub fn extract(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokens(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

/// Lowercased content words, in order of appearance.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| is_content_word(t))
        .map(str::to_lowercase)
}

fn is_content_word(token: &str) -> bool {
    let chars = token.chars().count();
    // CJK words are short; two characters already carry meaning.
    let min = if token.is_ascii() { 3 } else { 2 };
    if chars < min || chars > MAX_TOKEN_CHARS {
        return false;
    }
    if token.chars().all(|c| c.is_numeric()) {
        return false;
    }
    !STOPWORDS.contains(&token.to_lowercase().as_str())
}
