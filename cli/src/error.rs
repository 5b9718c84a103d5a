use std::io;

use thiserror::Error;

/// Exit code for usage errors and every internal failure.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code when the command itself could not be started.
pub const EXIT_NOT_STARTED: u8 = 127;

/// Everything that can stop the launcher. None of it is retried.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bad or missing arguments, or an explicit help request.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("cannot set {name}: {reason}")]
    Environment { name: String, reason: String },

    #[error("{0:#}")]
    Artifact(anyhow::Error),

    #[error("{op} failed: {source}")]
    Process {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Exec { .. } => EXIT_NOT_STARTED,
            LaunchError::Usage(_)
            | LaunchError::Environment { .. }
            | LaunchError::Artifact(_)
            | LaunchError::Process { .. } => EXIT_FAILURE,
        }
    }

    pub(crate) fn environment(name: impl Into<String>, reason: impl Into<String>) -> Self {
        LaunchError::Environment {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
