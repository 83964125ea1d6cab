use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use tracing::{debug, info};

use super::mounts::{DeviceNumber, MountTableReader};
use super::nodes::DeviceNodeEnumerator;
use crate::error::ResizeError;

/// The partition that holds `/` and the disk that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDevice {
    pub device: DeviceNumber,
    /// Partition node, e.g. `/dev/mmcblk0p2`
    pub node: String,
    /// Whole disk node, e.g. `/dev/mmcblk0`
    pub disk: String,
    pub partition_number: u32,
}

static PARTITION_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^(/dev/sd[a-z])([0-9]+)$").expect("valid sd pattern"),
        Regex::new(r"^(/dev/mmcblk[0-9])p([0-9]+)$").expect("valid mmcblk pattern"),
    ]
});

/// Split a partition node into its disk and partition number.
///
/// Only `/dev/sdX<N>` and `/dev/mmcblk<D>p<N>` are recognised.
pub fn disk_for_node(node: &str) -> Option<(String, u32)> {
    for re in PARTITION_PATTERNS.iter() {
        if let Some(caps) = re.captures(node) {
            let number = caps[2].parse().ok()?;
            return Some((caps[1].to_string(), number));
        }
    }
    None
}

/// Find the node whose device number matches `device`.
pub fn find_node(
    nodes: &dyn DeviceNodeEnumerator,
    device: DeviceNumber,
) -> anyhow::Result<Option<PathBuf>> {
    Ok(nodes
        .candidates()?
        .into_iter()
        .find(|node| nodes.device_number(node) == Some(device)))
}

/// Map the mounted root filesystem to its partition and disk.
pub fn resolve_root(
    mounts: &dyn MountTableReader,
    nodes: &dyn DeviceNodeEnumerator,
) -> Result<RootDevice, ResizeError> {
    let root = mounts.root_entry()?.ok_or(ResizeError::RootMountNotFound)?;
    let device = root.device;
    debug!(%device, source = %root.source, fs_type = %root.fs_type, "root mount");

    let node = find_node(nodes, device)?.ok_or_else(|| {
        ResizeError::NoDiskDevice(format!("no partition node matches device {}", device))
    })?;
    let node = node.to_string_lossy().into_owned();

    let (disk, partition_number) = disk_for_node(&node).ok_or_else(|| {
        ResizeError::NoDiskDevice(format!("{} is not a partition of a supported disk", node))
    })?;

    info!(
        %device,
        node = %node,
        disk = %disk,
        partition = partition_number,
        "resolved root device"
    );
    Ok(RootDevice {
        device,
        node,
        disk,
        partition_number,
    })
}
