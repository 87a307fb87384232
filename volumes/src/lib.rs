// ABOUTME: MobileOS volume manager library.
// ABOUTME: Boot-fact queries plus single and transactional multi-volume mounting.

pub mod bootinfo;
pub mod cmdline;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod mountpoint;
pub mod mountset;

#[cfg(test)]
mod testutil;

pub use bootinfo::BootInfo;
pub use cmdline::{CmdlineSource, ProcCmdline};
pub use command::{CommandRunner, DryRunRunner, SystemRunner};
pub use config::{Utilities, VolumeTable};
pub use error::{ErrorKind, MountError};
pub use mountpoint::{MountPoint, MountSpec, Mounter, SourceKind};
pub use mountset::MountSet;
