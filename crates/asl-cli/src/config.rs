//! Persistent configuration for the `asl` command.
//!
//! Stored in `~/.asl/config.json` (or `$ASL_HOME/config.json`). Command-line
//! flags and their environment variables take precedence over these values.
//!
//! # Example
//!
//! ```ignore
//! let mut config = AslConfig::load();
//! config.timeout_secs = Some(30);
//! config.save().unwrap();
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.json";

/// Directory holding the config file: `$ASL_HOME`, else `~/.asl`.
pub fn asl_dir() -> Option<PathBuf> {
    match std::env::var_os("ASL_HOME") {
        Some(dir) => Some(PathBuf::from(dir)),
        None => dirs::home_dir().map(|home| home.join(".asl")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AslConfig {
    /// JSON file holding counters, series and storage between runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// Upper bound on a single script run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// `tracing` filter used when neither `--log-level` nor `RUST_LOG` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl AslConfig {
    pub fn path() -> Option<PathBuf> {
        asl_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let dir = asl_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "could not determine home directory")
        })?;
        std::fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(dir.join(CONFIG_FILENAME), json)
    }
}
