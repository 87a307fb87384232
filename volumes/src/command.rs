// ABOUTME: Invocation of the external mount and umount utilities.
// ABOUTME: Runs an argument vector, captures output, and turns non-zero exits into errors.

use std::borrow::Cow;
use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{info, warn};

use crate::error::MountError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Stdout lines followed by stderr lines.
    pub lines: Vec<String>,
}

pub trait CommandRunner {
    /// Only a failure to start the program is an error here; a non-zero exit
    /// is reported through [`CommandOutput::status`].
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, MountError>;

    /// False when nothing may touch the system, including target preparation.
    fn executes(&self) -> bool {
        true
    }

    fn run_checked(&self, program: &str, args: &[OsString]) -> Result<Vec<String>, MountError> {
        let output = self.run(program, args).inspect_err(|e| {
            warn!(program, error = %e, "failed to start utility");
        })?;

        if output.status.success() {
            return Ok(output.lines);
        }

        warn!(program, args = ?args, status = %output.status, "utility failed");
        for line in &output.lines {
            warn!(program, "{line}");
        }

        Err(MountError::CommandFailed {
            program: program.to_string(),
            status: output.status,
            output: output.lines,
        })
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, MountError> {
        (**self).run(program, args)
    }

    fn executes(&self) -> bool {
        (**self).executes()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, MountError> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MountError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut lines = split_lines(&output.stdout);
        lines.extend(split_lines(&output.stderr));

        Ok(CommandOutput {
            status: output.status,
            lines,
        })
    }
}

/// Logs each invocation instead of running it and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, MountError> {
        info!(program, args = ?args, "dry run, not executing");
        Ok(CommandOutput {
            status: ExitStatus::from_raw(0),
            lines: Vec::new(),
        })
    }

    fn executes(&self) -> bool {
        false
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
    text.lines().map(str::to_string).collect()
}
