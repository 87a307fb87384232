// ABOUTME: MobileOS volume manager command-line entry point.
// ABOUTME: Answers boot-fact queries and mounts or tears down volume tables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use mos_volumes::cmdline::DEFAULT_CMDLINE_PATH;
use mos_volumes::config::{load_table, Utilities};
use mos_volumes::{
    logging, BootInfo, CommandRunner, DryRunRunner, MountPoint, MountSet, MountSpec, Mounter,
    ProcCmdline, SystemRunner,
};

#[derive(Parser)]
#[command(name = "mos-volumes")]
#[command(about = "Mount boot volumes and report boot configuration")]
struct Cli {
    /// File holding the kernel boot parameters
    #[arg(long, global = true, default_value = DEFAULT_CMDLINE_PATH)]
    cmdline: PathBuf,

    /// Log the commands that would run instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Mount program, overriding any volume table setting
    #[arg(long, global = true)]
    mount_program: Option<String>,

    /// Unmount program, overriding any volume table setting
    #[arg(long, global = true)]
    umount_program: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root device (root=)
    RootDevice,
    /// Print the root device without its partition number
    RootDisk,
    /// Print the boot device (boot=, or partition 1 of the root disk)
    BootDevice,
    /// Print "yes" if the root filesystem is encrypted, "no" otherwise
    RootEncrypted,
    /// Mount a single volume
    Mount {
        source: String,
        target: PathBuf,
        /// Filesystem type
        #[arg(short = 't', long = "type")]
        fs_type: Option<String>,
        /// Comma-separated mount options
        #[arg(short, long)]
        options: Option<String>,
    },
    /// Unmount a single volume
    Umount { target: PathBuf },
    /// Mount every volume of a table in order, rolling back on failure
    MountAll {
        #[arg(long)]
        table: PathBuf,
    },
    /// Unmount targets in reverse order, attempting all of them
    UmountAll {
        /// Volume table whose targets are unmounted
        #[arg(long, conflicts_with = "targets")]
        table: Option<PathBuf>,
        targets: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.dry_run {
        execute(&cli, DryRunRunner)
    } else {
        execute(&cli, SystemRunner)
    }
}

fn execute<R: CommandRunner>(cli: &Cli, runner: R) -> Result<()> {
    let boot = BootInfo::new(ProcCmdline::new(&cli.cmdline));

    match &cli.command {
        Commands::RootDevice => println!("{}", boot.root_device()?),
        Commands::RootDisk => println!("{}", boot.root_disk()?),
        Commands::BootDevice => println!("{}", boot.boot_device()?),
        Commands::RootEncrypted => {
            let encrypted = boot.is_root_encrypted()?;
            println!("{}", if encrypted { "yes" } else { "no" });
        }
        Commands::Mount {
            source,
            target,
            fs_type,
            options,
        } => {
            warn_unless_root(cli.dry_run);
            let mut spec = MountSpec::new(source.as_str(), target)?;
            if let Some(fs_type) = fs_type {
                spec = spec.with_fs_type(fs_type);
            }
            if let Some(options) = options {
                spec = spec.with_options(options);
            }
            MountPoint::new(runner, utilities(cli, Utilities::default())).mount(&spec)?;
        }
        Commands::Umount { target } => {
            warn_unless_root(cli.dry_run);
            MountPoint::new(runner, utilities(cli, Utilities::default())).unmount(target)?;
        }
        Commands::MountAll { table } => {
            warn_unless_root(cli.dry_run);
            let table = load_table(table)?;
            let set = MountSet::new(MountPoint::new(runner, utilities(cli, table.utilities)));
            let mounted = set
                .mount_all(&table.volumes)
                .context("volume table was not mounted")?;
            info!(count = mounted.len(), "volume table mounted");
        }
        Commands::UmountAll { table, targets } => {
            warn_unless_root(cli.dry_run);
            let (base, targets) = match table {
                Some(path) => {
                    let table = load_table(path)?;
                    let targets = table.targets();
                    (table.utilities, targets)
                }
                None => (Utilities::default(), targets.clone()),
            };
            if targets.is_empty() {
                warn!("nothing to unmount");
                return Ok(());
            }
            MountSet::new(MountPoint::new(runner, utilities(cli, base))).unmount_all(&targets)?;
        }
    }

    Ok(())
}

fn utilities(cli: &Cli, base: Utilities) -> Utilities {
    Utilities {
        mount: cli.mount_program.clone().unwrap_or(base.mount),
        umount: cli.umount_program.clone().unwrap_or(base.umount),
    }
}

fn warn_unless_root(dry_run: bool) {
    if !dry_run && !rustix::process::geteuid().is_root() {
        warn!("not running as root, mount operations will likely fail");
    }
}
