// ABOUTME: Volume table parsing for the volume manager.
// ABOUTME: Reads TOML volume tables and produces ordered MountSpec lists.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::mountpoint::MountSpec;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Utilities {
    pub mount: String,
    pub umount: String,
}

impl Default for Utilities {
    fn default() -> Self {
        Self {
            mount: "mount".to_string(),
            umount: "umount".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeTable {
    #[serde(default)]
    pub utilities: Utilities,
    #[serde(default, rename = "volume")]
    pub volumes: Vec<MountSpec>,
}

impl VolumeTable {
    pub fn targets(&self) -> Vec<PathBuf> {
        self.volumes.iter().map(|v| v.target().to_path_buf()).collect()
    }
}

pub fn parse_table(toml_str: &str) -> Result<VolumeTable> {
    toml::from_str(toml_str).context("failed to parse volume table")
}

pub fn load_table(path: &Path) -> Result<VolumeTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_table(&content).with_context(|| format!("failed to parse {}", path.display()))
}
