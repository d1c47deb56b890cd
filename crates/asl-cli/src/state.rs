//! JSON state file backing the in-memory provider between runs.

use std::path::Path;

use asl_core::MemoryState;
use tracing::debug;

use crate::error::CliError;

/// Reads the state file. A missing file is an empty state.
pub fn load(path: &Path) -> Result<MemoryState, CliError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file yet");
            return Ok(MemoryState::default());
        }
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(MemoryState::default());
    }
    serde_json::from_str(&text).map_err(|source| CliError::State {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save(path: &Path, state: &MemoryState) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state).map_err(|source| CliError::State {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), counters = state.counters.len(), series = state.series.len(), "state saved");
    Ok(())
}
