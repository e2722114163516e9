// signal.rs - The bounded textual representation of a file used for rule
// matching.

use serde::{Deserialize, Serialize};

use crate::keywords;

/// Which extractor family produced a signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Text,
    Office,
    Pdf,
    Image,
    /// No extractor handles the file; only its name and extension are used.
    None,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Office => "office",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampled content plus the keywords extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,

    /// Whitespace-normalized sample, at most `max_signal_chars` characters.
    pub text: String,

    /// Most frequent content words of the full text, most frequent first.
    pub keywords: Vec<String>,
}

impl Signal {
    /// Build a signal from raw extracted text. Keywords come from the whole
    /// text, not just the sample.
    pub fn from_text(kind: SignalKind, raw: &str, max_chars: usize, max_keywords: usize) -> Self {
        let text = sample(raw, max_chars);
        let keywords = keywords::extract(raw, max_keywords);
        Self {
            kind,
            text,
            keywords,
        }
    }

    /// The empty signal for unsupported files.
    pub fn null() -> Self {
        Self {
            kind: SignalKind::None,
            text: String::new(),
            keywords: Vec::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == SignalKind::None
    }

    /// Case-insensitive containment test against the sampled text.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && self.text.to_lowercase().contains(&needle)
    }
}

/// Normalize whitespace and, when the result is longer than `max_chars`,
/// keep equal slices from the front, middle and back.
pub fn sample(raw: &str, max_chars: usize) -> String {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let total = normalized.chars().count();
    if total <= max_chars {
        return normalized;
    }
    let part = max_chars / 3;
    if part == 0 {
        return normalized.chars().take(max_chars).collect();
    }
    let slice = |from: usize| normalized.chars().skip(from).take(part).collect::<String>();
    let middle = (total - part) / 2;
    format!("{} {} {}", slice(0), slice(middle), slice(total - part))
}
