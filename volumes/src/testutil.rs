// ABOUTME: Test doubles for the command runner and the mounter.
// ABOUTME: Record every call so tests can assert on order and arguments.

use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::command::{CommandOutput, CommandRunner};
use crate::error::MountError;
use crate::mountpoint::{MountSpec, Mounter};

/// Records invocations; exits 1 when any argument is in the failing set.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Vec<String>>>,
    failing: HashSet<String>,
}

impl RecordingRunner {
    pub fn failing_on(args: &[&str]) -> Self {
        Self {
            calls: RefCell::default(),
            failing: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Program followed by its arguments, one entry per invocation.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, MountError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));

        let fail = call[1..].iter().any(|a| self.failing.contains(a));
        self.calls.borrow_mut().push(call);

        if fail {
            Ok(CommandOutput {
                status: ExitStatus::from_raw(1 << 8),
                lines: vec![format!("{program}: simulated failure")],
            })
        } else {
            Ok(CommandOutput {
                status: ExitStatus::from_raw(0),
                lines: Vec::new(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mount(PathBuf),
    Unmount(PathBuf),
}

/// Mounter that succeeds unless the target is listed as failing.
#[derive(Default)]
pub struct FakeMounter {
    calls: RefCell<Vec<Call>>,
    failing_mounts: HashSet<PathBuf>,
    failing_unmounts: HashSet<PathBuf>,
}

impl FakeMounter {
    pub fn fail_mount(mut self, target: &str) -> Self {
        self.failing_mounts.insert(PathBuf::from(target));
        self
    }

    pub fn fail_unmount(mut self, target: &str) -> Self {
        self.failing_unmounts.insert(PathBuf::from(target));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn unmounts(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Unmount(p) => Some(p.clone()),
                Call::Mount(_) => None,
            })
            .collect()
    }

    fn failure(target: &Path) -> MountError {
        MountError::CommandFailed {
            program: "fake".to_string(),
            status: ExitStatus::from_raw(1 << 8),
            output: vec![format!("{}: simulated failure", target.display())],
        }
    }
}

impl Mounter for FakeMounter {
    fn mount(&self, spec: &MountSpec) -> Result<(), MountError> {
        let target = spec.target();
        self.calls.borrow_mut().push(Call::Mount(target.to_path_buf()));
        if self.failing_mounts.contains(target) {
            return Err(Self::failure(target));
        }
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<(), MountError> {
        self.calls.borrow_mut().push(Call::Unmount(target.to_path_buf()));
        if self.failing_unmounts.contains(target) {
            return Err(Self::failure(target));
        }
        Ok(())
    }
}

pub fn spec(target: &str) -> MountSpec {
    MountSpec::new("tmpfs", target).unwrap()
}
