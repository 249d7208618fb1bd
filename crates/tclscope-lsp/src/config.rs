//! Workspace configuration delivered via `workspace/didChangeConfiguration`.

use serde::Deserialize;

/// Settings the client may push to the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceOptions {
    /// Directories the workspace's scripts load from. Recorded for future
    /// cross-file indexing; nothing is scanned from disk today.
    #[serde(default)]
    pub auto_path: Vec<String>,
}
