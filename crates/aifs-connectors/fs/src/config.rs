//! Filesystem operation settings (`[fs]` section of `config.toml`).

use serde::{Deserialize, Serialize};

use crate::trash::DeleteMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Where deleted items go.
    #[serde(default)]
    pub delete_mode: DeleteMode,

    /// Reads without an explicit window return at most this many bytes.
    #[serde(default = "default_read_max_bytes")]
    pub read_max_bytes: u64,

    /// Maximum number of matches a search yields; 0 means unlimited.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            delete_mode: DeleteMode::default(),
            read_max_bytes: default_read_max_bytes(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_read_max_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_search_limit() -> usize {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_section() {
        let config: FsConfig = toml::from_str("").unwrap();
        assert_eq!(config.delete_mode, DeleteMode::System);
        assert_eq!(config.search_limit, 500);
    }

    #[test]
    fn holding_mode_parses() {
        let config: FsConfig = toml::from_str("delete_mode = \"holding\"").unwrap();
        assert_eq!(config.delete_mode, DeleteMode::Holding);
    }
}
