use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::mounts::DeviceNumber;

/// SCSI/SATA partitions and MMC partitions.
const CANDIDATE_PATTERNS: &[&str] = &["sd[a-z][0-9]*", "mmcblk[0-9]p[0-9]*"];

pub trait DeviceNodeEnumerator {
    /// Partition nodes that could back the root filesystem.
    fn candidates(&self) -> Result<Vec<PathBuf>>;

    /// Device number of a block device node, `None` for anything else.
    fn device_number(&self, node: &Path) -> Option<DeviceNumber>;
}

/// Enumerates real nodes below `/dev`.
pub struct DevNodes {
    dev_dir: PathBuf,
}

impl DevNodes {
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }
}

impl Default for DevNodes {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DeviceNodeEnumerator for DevNodes {
    fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut nodes = Vec::new();
        for pattern in CANDIDATE_PATTERNS {
            let full = self.dev_dir.join(pattern);
            let full = full.to_string_lossy();
            let matches =
                glob::glob(&full).with_context(|| format!("invalid device pattern {}", full))?;
            nodes.extend(matches.filter_map(|entry| entry.ok()));
        }
        debug!("{} candidate device nodes", nodes.len());
        Ok(nodes)
    }

    fn device_number(&self, node: &Path) -> Option<DeviceNumber> {
        let metadata = fs::metadata(node).ok()?;
        if !metadata.file_type().is_block_device() {
            return None;
        }
        Some(DeviceNumber::from_rdev(metadata.rdev()))
    }
}
