// ABOUTME: Read-only boot facts derived from the kernel command line.
// ABOUTME: Root device, root disk, boot device, and whether the root is encrypted.

use tracing::warn;

use crate::cmdline::CmdlineSource;
use crate::error::MountError;

const DEFAULT_BOOT_PARTITION: &str = "1";

/// Answers boot-configuration queries against a [`CmdlineSource`].
///
/// Every query reads the source again. Use [`BootInfo::snapshot`] when several
/// answers must agree with each other.
#[derive(Debug, Clone)]
pub struct BootInfo<S> {
    source: S,
}

impl<S: CmdlineSource> BootInfo<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Reads the line once and returns a `BootInfo` that answers from that copy.
    pub fn snapshot(&self) -> Result<BootInfo<String>, MountError> {
        let line = self.read()?;
        Ok(BootInfo::new(line))
    }

    pub fn root_device(&self) -> Result<String, MountError> {
        let line = self.read()?;
        require(last_token_value(&line, "root"), "root")
    }

    /// Root device with its trailing partition number removed.
    ///
    /// Only a trailing run of decimal digits is stripped, so `/dev/mmcblk0p12`
    /// becomes `/dev/mmcblk0p`.
    pub fn root_disk(&self) -> Result<String, MountError> {
        let device = self.root_device()?;
        Ok(strip_partition(&device).to_string())
    }

    pub fn boot_device(&self) -> Result<String, MountError> {
        let line = self.read()?;

        if let Some(boot) = last_token_value(&line, "boot") {
            return Ok(boot.to_string());
        }

        let root = require(last_token_value(&line, "root"), "root")?;
        Ok(replace_partition(&root, DEFAULT_BOOT_PARTITION))
    }

    pub fn is_root_encrypted(&self) -> Result<bool, MountError> {
        let line = self.read()?;
        Ok(line.contains("crypt"))
    }

    fn read(&self) -> Result<String, MountError> {
        self.source.read_line().inspect_err(|e| {
            warn!(error = %e, "cannot read boot parameters");
        })
    }
}

fn require(value: Option<&str>, key: &'static str) -> Result<String, MountError> {
    match value {
        Some(value) => Ok(value.to_string()),
        None => {
            warn!(key, "boot parameter not found");
            Err(MountError::Parse { key })
        }
    }
}

/// Last whitespace-delimited `key=value` token wins; empty values are skipped.
pub fn last_token_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_whitespace()
        .rev()
        .filter_map(|token| token.strip_prefix(key)?.strip_prefix('='))
        .find(|value| !value.is_empty())
}

/// Removes a trailing run of ASCII digits, leaving everything else untouched.
pub fn strip_partition(device: &str) -> &str {
    device.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Replaces a trailing digit run with `partition`. Devices without one are returned as-is.
pub fn replace_partition(device: &str, partition: &str) -> String {
    let disk = strip_partition(device);
    if disk.len() == device.len() {
        device.to_string()
    } else {
        format!("{disk}{partition}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline::ProcCmdline;
    use crate::error::ErrorKind;

    fn info(line: &str) -> BootInfo<String> {
        BootInfo::new(line.to_string())
    }

    #[test]
    fn root_device_from_plain_line() {
        let boot = info("BOOT_IMAGE=/vmlinuz root=/dev/sda2 ro quiet");
        assert_eq!(boot.root_device().unwrap(), "/dev/sda2");
    }

    #[test]
    fn last_root_token_wins() {
        let boot = info("root=/dev/sda2 quiet root=/dev/sdb7");
        assert_eq!(boot.root_device().unwrap(), "/dev/sdb7");
    }

    #[test]
    fn prefixed_keys_are_not_root_tokens() {
        let boot = info("crypt_root=/dev/sdc1 root=/dev/sda3");
        assert_eq!(boot.root_device().unwrap(), "/dev/sda3");

        let boot = info("crypt_root=/dev/sdc1 quiet");
        assert_eq!(boot.root_device().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn empty_root_value_is_ignored() {
        let boot = info("root= quiet");
        assert_eq!(boot.root_device().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn root_disk_strips_trailing_digits() {
        assert_eq!(info("root=/dev/sda5").root_disk().unwrap(), "/dev/sda");
    }

    #[test]
    fn root_disk_strips_only_digits_for_p_separated_partitions() {
        // Known limitation: the "p" separator is kept.
        assert_eq!(
            info("root=/dev/mmcblk0p12").root_disk().unwrap(),
            "/dev/mmcblk0p"
        );
    }

    #[test]
    fn root_disk_without_partition_is_unchanged() {
        assert_eq!(info("root=/dev/vda").root_disk().unwrap(), "/dev/vda");
    }

    #[test]
    fn boot_device_prefers_boot_token() {
        let boot = info("root=/dev/sda3 boot=/dev/sdb1");
        assert_eq!(boot.boot_device().unwrap(), "/dev/sdb1");
    }

    #[test]
    fn boot_device_falls_back_to_first_partition_of_root_disk() {
        assert_eq!(info("root=/dev/sda5 quiet").boot_device().unwrap(), "/dev/sda1");
        assert_eq!(info("root=/dev/sda12").boot_device().unwrap(), "/dev/sda1");
        assert_eq!(
            info("root=/dev/mmcblk0p12").boot_device().unwrap(),
            "/dev/mmcblk0p1"
        );
    }

    #[test]
    fn boot_device_fallback_without_partition_digits() {
        assert_eq!(info("root=/dev/vda").boot_device().unwrap(), "/dev/vda");
    }

    #[test]
    fn neither_token_is_a_parse_error() {
        let boot = info("quiet splash");
        assert_eq!(boot.root_device().unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(boot.boot_device().unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(boot.root_disk().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn encryption_is_a_substring_match() {
        assert!(info("root=/dev/sda1 crypt_root=1").is_root_encrypted().unwrap());
        assert!(info("root=/dev/mapper/cryptroot").is_root_encrypted().unwrap());
        assert!(!info("root=/dev/sda1 quiet").is_root_encrypted().unwrap());
        assert!(!info("root=/dev/sda1 CRYPT").is_root_encrypted().unwrap());
        assert!(!info("").is_root_encrypted().unwrap());
    }

    #[test]
    fn unreadable_source_fails_every_query() {
        let boot = BootInfo::new(ProcCmdline::new("/nonexistent/cmdline"));
        assert_eq!(boot.root_device().unwrap_err().kind(), ErrorKind::SourceUnavailable);
        assert_eq!(boot.root_disk().unwrap_err().kind(), ErrorKind::SourceUnavailable);
        assert_eq!(boot.boot_device().unwrap_err().kind(), ErrorKind::SourceUnavailable);
        assert_eq!(
            boot.is_root_encrypted().unwrap_err().kind(),
            ErrorKind::SourceUnavailable
        );
    }

    #[test]
    fn non_utf8_cmdline_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdline");
        std::fs::write(&path, b"root=/dev/sda2 hostname=caf\xe9 quiet\n").unwrap();

        let boot = BootInfo::new(ProcCmdline::new(&path));
        assert_eq!(boot.root_device().unwrap(), "/dev/sda2");
        assert_eq!(boot.boot_device().unwrap(), "/dev/sda1");
        assert!(!boot.is_root_encrypted().unwrap());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdline");
        std::fs::write(&path, "root=/dev/sda2\n").unwrap();

        let live = BootInfo::new(ProcCmdline::new(&path));
        let snapshot = live.snapshot().unwrap();

        std::fs::write(&path, "root=/dev/sdb4 cryptdevice=x\n").unwrap();

        assert_eq!(live.root_device().unwrap(), "/dev/sdb4");
        assert!(live.is_root_encrypted().unwrap());
        assert_eq!(snapshot.root_device().unwrap(), "/dev/sda2");
        assert!(!snapshot.is_root_encrypted().unwrap());
    }

    #[test]
    fn replace_partition_handles_multi_digit_runs() {
        assert_eq!(replace_partition("/dev/nvme0n1p15", "1"), "/dev/nvme0n1p1");
        assert_eq!(replace_partition("/dev/sda", "1"), "/dev/sda");
    }
}
