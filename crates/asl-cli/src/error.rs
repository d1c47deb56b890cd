use std::path::PathBuf;
use std::process::ExitCode;

use asl_core::{ProviderError, ScriptError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Script timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file exists but is not valid JSON state.
    #[error("Invalid state file {}: {source}", path.display())]
    State {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("State error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid option: {0}")]
    Usage(String),

    #[error("Script task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Script(ScriptError::Syntax(_)) => ExitCode::from(2),
            CliError::Script(ScriptError::Runtime(_)) => ExitCode::from(3),
            CliError::Timeout(_) => ExitCode::from(5),
            CliError::Io(_) | CliError::State { .. } | CliError::Provider(_) => ExitCode::from(4),
            CliError::Usage(_) | CliError::Task(_) => ExitCode::from(1),
        }
    }
}
