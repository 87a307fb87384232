// ABOUTME: A single mount or unmount against one source/target pair.
// ABOUTME: Prepares the target path, then drives the external mount utility.

use serde::Deserialize;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::{CommandRunner, SystemRunner};
use crate::config::Utilities;
use crate::error::MountError;

/// What to mount where. Immutable once built; the target is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMountSpec")]
pub struct MountSpec {
    source: String,
    target: PathBuf,
    fs_type: Option<String>,
    options: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMountSpec {
    source: String,
    target: PathBuf,
    #[serde(default)]
    fs_type: Option<String>,
    #[serde(default)]
    options: Option<String>,
}

impl TryFrom<RawMountSpec> for MountSpec {
    type Error = MountError;

    fn try_from(raw: RawMountSpec) -> Result<Self, Self::Error> {
        let spec = MountSpec::new(raw.source, raw.target)?;
        Ok(MountSpec {
            fs_type: non_empty(raw.fs_type),
            options: non_empty(raw.options),
            ..spec
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Path,
    /// Label or pseudo-filesystem tag, resolved by the mount utility.
    Symbolic,
}

impl MountSpec {
    pub fn new(source: impl Into<String>, target: impl Into<PathBuf>) -> Result<Self, MountError> {
        let source = source.into();
        let target = target.into();

        if target.as_os_str().is_empty() {
            return Err(MountError::InvalidSpec(format!(
                "empty target for source '{source}'"
            )));
        }
        if source.is_empty() {
            return Err(MountError::InvalidSpec(format!(
                "empty source for target {}",
                target.display()
            )));
        }

        Ok(Self {
            source,
            target,
            fs_type: None,
            options: None,
        })
    }

    pub fn with_fs_type(self, fs_type: impl Into<String>) -> Self {
        Self {
            fs_type: non_empty(Some(fs_type.into())),
            ..self
        }
    }

    pub fn with_options(self, options: impl Into<String>) -> Self {
        Self {
            options: non_empty(Some(options.into())),
            ..self
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn fs_type(&self) -> Option<&str> {
        self.fs_type.as_deref()
    }

    pub fn options(&self) -> Option<&str> {
        self.options.as_deref()
    }

    pub fn source_kind(&self) -> SourceKind {
        if self.source.starts_with('/') {
            SourceKind::Path
        } else {
            SourceKind::Symbolic
        }
    }
}

pub trait Mounter {
    fn mount(&self, spec: &MountSpec) -> Result<(), MountError>;
    fn unmount(&self, target: &Path) -> Result<(), MountError>;
}

// Nothing done here is undone on failure; MountSet owns rollback.
#[derive(Debug, Clone)]
pub struct MountPoint<R> {
    runner: R,
    utilities: Utilities,
}

impl MountPoint<SystemRunner> {
    pub fn system() -> Self {
        Self::new(SystemRunner, Utilities::default())
    }
}

impl<R: CommandRunner> MountPoint<R> {
    pub fn new(runner: R, utilities: Utilities) -> Self {
        Self { runner, utilities }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner> Mounter for MountPoint<R> {
    fn mount(&self, spec: &MountSpec) -> Result<(), MountError> {
        if self.runner.executes() {
            prepare_target(spec)?;
        } else {
            info!(target = %spec.target().display(), "dry run, target left as is");
        }

        let args = mount_args(spec);
        debug!(program = %self.utilities.mount, args = ?args, "invoking mount");

        self.runner
            .run_checked(&self.utilities.mount, &args)
            .inspect_err(|e| {
                warn!(source = spec.source(), target = %spec.target().display(), error = %e, "mount failed");
            })?;

        info!(
            source = spec.source(),
            target = %spec.target().display(),
            fstype = spec.fs_type().unwrap_or("auto"),
            "mounted"
        );
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<(), MountError> {
        let args = [target.as_os_str().to_os_string()];
        debug!(program = %self.utilities.umount, args = ?args, "invoking umount");

        self.runner
            .run_checked(&self.utilities.umount, &args)
            .inspect_err(|e| {
                warn!(target = %target.display(), error = %e, "unmount failed");
            })?;

        info!(target = %target.display(), "unmounted");
        Ok(())
    }
}

pub fn mount_args(spec: &MountSpec) -> Vec<OsString> {
    let mut args = Vec::with_capacity(6);

    if let Some(fs_type) = spec.fs_type() {
        args.push(OsString::from("-t"));
        args.push(OsString::from(fs_type));
    }
    if let Some(options) = spec.options() {
        args.push(OsString::from("-o"));
        args.push(OsString::from(options));
    }

    args.push(OsString::from(spec.source()));
    args.push(spec.target().as_os_str().to_os_string());
    args
}

/// Makes sure the target path has the shape the source needs before mounting.
///
/// Directories and block devices get a directory target, replacing any
/// non-directory entry there. Regular files get an empty file target.
/// Symbolic sources get a directory target. A path source that does not
/// exist leaves the target alone and the mount utility reports the problem.
pub fn prepare_target(spec: &MountSpec) -> Result<(), MountError> {
    let target = spec.target();

    match spec.source_kind() {
        SourceKind::Symbolic => {
            if !entry_exists(target) {
                create_dir(target)?;
            }
        }
        SourceKind::Path => {
            let metadata = match fs::metadata(spec.source()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(source = spec.source(), error = %e, "source not inspectable, target left as is");
                    return Ok(());
                }
            };
            let file_type = metadata.file_type();

            if file_type.is_dir() || file_type.is_block_device() {
                if !target.is_dir() {
                    if entry_exists(target) {
                        debug!(target = %target.display(), "removing non-directory target");
                        fs::remove_file(target).map_err(|e| prep_error(target, e))?;
                    }
                    create_dir(target)?;
                }
            } else if file_type.is_file() && !entry_exists(target) {
                create_file(target)?;
            }
        }
    }

    Ok(())
}

fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn create_dir(target: &Path) -> Result<(), MountError> {
    debug!(target = %target.display(), "creating directory target");
    fs::create_dir_all(target).map_err(|e| prep_error(target, e))
}

fn create_file(target: &Path) -> Result<(), MountError> {
    debug!(target = %target.display(), "creating file target");
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map(drop)
        .map_err(|e| prep_error(target, e))
}

fn prep_error(target: &Path, source: std::io::Error) -> MountError {
    warn!(target = %target.display(), error = %source, "cannot prepare mount target");
    MountError::TargetPrep {
        path: target.to_path_buf(),
        source,
    }
}
