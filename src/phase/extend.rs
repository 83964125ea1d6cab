//! Phase 1: move the root partition's end to the end of the free space.

use anyhow::Result;
use tracing::{info, warn};

use crate::device::RootDevice;
use crate::flags::{Flag, FlagFileStore};
use crate::partition::{CommitOutcome, PartitionTableService};
use crate::tools::Rebooter;

/// Filesystems whose resize tool can grow them online after the reboot.
pub const GROWABLE_FS_TYPES: &[&str] = &["ext2", "ext3", "ext4"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendOutcome {
    Grown {
        old_end: u64,
        new_end: u64,
        commit: CommitOutcome,
    },
    Skipped(String),
    Failed(String),
}

/// Grow the partition in the table. Never fails; problems become outcomes.
pub fn extend_partition(root: &RootDevice, service: &dyn PartitionTableService) -> ExtendOutcome {
    match try_extend(root, service) {
        Ok(outcome) => outcome,
        Err(e) => ExtendOutcome::Failed(format!("{:#}", e)),
    }
}

fn try_extend(root: &RootDevice, service: &dyn PartitionTableService) -> Result<ExtendOutcome> {
    let mut table = service.open(&root.disk)?;
    let entry = table.entry(&root.node)?;
    let alignment = table.optimal_alignment();
    let max_end = table.max_end(&root.node, &alignment)?;

    let fs_type = table.fs_type(&root.node)?;
    let growable = fs_type
        .as_deref()
        .is_some_and(|t| GROWABLE_FS_TYPES.contains(&t));
    if !growable {
        return Ok(ExtendOutcome::Skipped(format!(
            "filesystem {} on {} cannot be grown",
            fs_type.as_deref().unwrap_or("unknown"),
            root.node
        )));
    }
    if max_end <= entry.end() {
        return Ok(ExtendOutcome::Skipped(format!(
            "{} already ends at the last usable sector {}",
            root.node,
            entry.end()
        )));
    }

    table.set_geometry(&root.node, entry.start, max_end)?;
    let commit = table.commit();
    Ok(ExtendOutcome::Grown {
        old_end: entry.end(),
        new_end: max_end,
        commit,
    })
}

/// Run phase 1: extend, hand over to phase 2, reboot.
///
/// The flag transition and the reboot happen whatever the extension did;
/// the reboot is what makes the kernel pick up the new table.
pub fn run(
    root: &RootDevice,
    service: &dyn PartitionTableService,
    flags: &dyn FlagFileStore,
    rebooter: &dyn Rebooter,
) -> Result<ExtendOutcome> {
    let outcome = extend_partition(root, service);
    match &outcome {
        ExtendOutcome::Grown {
            old_end,
            new_end,
            commit,
        } => {
            info!(device = %root.node, old_end, new_end, "partition end moved");
            match commit {
                CommitOutcome::Committed => info!("kernel accepted the new partition table"),
                CommitOutcome::ExpectedRejection(reason) => {
                    info!("partition table in use, applied at next boot ({})", reason)
                }
                CommitOutcome::UnexpectedError(reason) => {
                    warn!("partition table commit failed: {}", reason)
                }
            }
        }
        ExtendOutcome::Skipped(reason) => info!("not extending partition: {}", reason),
        ExtendOutcome::Failed(reason) => warn!("partition extension failed: {}", reason),
    }

    // resize-pending first: a crash in between leaves both flags, never none
    flags.create(Flag::ResizePending)?;
    flags.remove(Flag::RepartitionPending)?;

    rebooter.reboot()?;
    Ok(outcome)
}
