// trash.rs - Reversible delete through the platform recycle bin.

use serde::{Deserialize, Serialize};

use aifs_workspace::ResolvedPath;

use crate::error::FsError;

/// Where `delete` sends its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// The operating system's trash / recycle bin.
    #[default]
    System,
    /// The workspace-local holding area under the data directory.
    Holding,
}

/// Move a path to the platform trash.
pub(crate) fn send_to_system_trash(target: &ResolvedPath) -> Result<(), FsError> {
    trash::delete(target.absolute()).map_err(|e| FsError::Trash {
        path: target.relative().to_string(),
        detail: e.to_string(),
    })
}
