// ABOUTME: Error type shared by the boot-fact queries and mount operations.
// ABOUTME: Each variant maps onto one of the failure kinds callers branch on.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    Parse,
    TargetPrep,
    ExternalCommand,
    Invalid,
    Teardown,
}

#[derive(Error, Debug)]
pub enum MountError {
    #[error("boot parameters unavailable at {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("boot parameters carry no {key}= token")]
    Parse { key: &'static str },

    #[error("failed to prepare mount target {}: {source}", path.display())]
    TargetPrep {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        output: Vec<String>,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mount specification: {0}")]
    InvalidSpec(String),

    #[error("{failed} of {total} unmounts failed")]
    Teardown { failed: usize, total: usize },
}

impl MountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MountError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            MountError::Parse { .. } => ErrorKind::Parse,
            MountError::TargetPrep { .. } => ErrorKind::TargetPrep,
            MountError::CommandFailed { .. } | MountError::Spawn { .. } => {
                ErrorKind::ExternalCommand
            }
            MountError::InvalidSpec(_) => ErrorKind::Invalid,
            MountError::Teardown { .. } => ErrorKind::Teardown,
        }
    }

    /// Output captured from the external utility, if this is a command failure.
    pub fn output(&self) -> &[String] {
        match self {
            MountError::CommandFailed { output, .. } => output,
            _ => &[],
        }
    }
}
