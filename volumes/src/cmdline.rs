// ABOUTME: Sources of the kernel boot-parameter line.
// ABOUTME: Reads /proc/cmdline (or a substitute file) fresh on every request.

use std::path::{Path, PathBuf};

use crate::error::MountError;

pub const DEFAULT_CMDLINE_PATH: &str = "/proc/cmdline";

/// Implementations must not cache: each call reflects the source as it is now.
pub trait CmdlineSource {
    fn read_line(&self) -> Result<String, MountError>;
}

#[derive(Debug, Clone)]
pub struct ProcCmdline {
    path: PathBuf,
}

impl ProcCmdline {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ProcCmdline {
    fn default() -> Self {
        Self::new(DEFAULT_CMDLINE_PATH)
    }
}

impl CmdlineSource for ProcCmdline {
    fn read_line(&self) -> Result<String, MountError> {
        let bytes = std::fs::read(&self.path).map_err(|source| MountError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;

        // Kernel cmdline bytes need not be UTF-8.
        let content = String::from_utf8_lossy(&bytes);
        Ok(content.lines().next().unwrap_or_default().to_string())
    }
}

// A line already in memory, used for snapshots.
impl CmdlineSource for str {
    fn read_line(&self) -> Result<String, MountError> {
        Ok(self.to_string())
    }
}

impl CmdlineSource for String {
    fn read_line(&self) -> Result<String, MountError> {
        self.as_str().read_line()
    }
}

impl<S: CmdlineSource + ?Sized> CmdlineSource for &S {
    fn read_line(&self) -> Result<String, MountError> {
        (**self).read_line()
    }
}
