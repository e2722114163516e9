//! Classification settings (`[classify]` and `[index]` sections of `config.toml`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Upper bound on the sampled text kept per file for rule matching.
    #[serde(default = "default_max_signal_chars")]
    pub max_signal_chars: usize,

    /// How many unmatched files must share a keyword or extension before a
    /// rule is proposed for it.
    #[serde(default = "default_min_support")]
    pub min_support: usize,

    /// Workspace-relative folder for files no rule matches.
    #[serde(default = "default_unclassified_dir")]
    pub unclassified_dir: String,

    /// Keywords kept per file.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,

    /// Rule document location. Defaults to `.aifs/classify_rules.toml`.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            max_signal_chars: default_max_signal_chars(),
            min_support: default_min_support(),
            unclassified_dir: default_unclassified_dir(),
            max_keywords: default_max_keywords(),
            rules_file: None,
        }
    }
}

/// Hand-off to the external indexer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Embedding model the indexer will use. Without one the hook stays off
    /// even when `enabled` is set.
    #[serde(default)]
    pub embedding_model: Option<String>,
}

impl IndexConfig {
    pub fn is_active(&self) -> bool {
        self.enabled
            && self
                .embedding_model
                .as_deref()
                .map(|m| !m.trim().is_empty())
                .unwrap_or(false)
    }
}

fn default_max_signal_chars() -> usize {
    1500
}

fn default_min_support() -> usize {
    2
}

fn default_unclassified_dir() -> String {
    "unclassified".to_string()
}

fn default_max_keywords() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_section() {
        let config: ClassifyConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_signal_chars, 1500);
        assert_eq!(config.min_support, 2);
        assert_eq!(config.unclassified_dir, "unclassified");
        assert!(config.rules_file.is_none());
    }

    #[test]
    fn index_needs_model() {
        let config: IndexConfig = toml::from_str("enabled = true").unwrap();
        assert!(!config.is_active());

        let config: IndexConfig =
            toml::from_str("enabled = true\nembedding_model = \"nomic-embed-text\"").unwrap();
        assert!(config.is_active());

        let config: IndexConfig = toml::from_str("embedding_model = \"nomic-embed-text\"").unwrap();
        assert!(!config.is_active());
    }
}
