//! Partition-table contract used by the repartition phase.

pub mod alignment;
pub mod sfdisk;

use anyhow::Result;

pub use alignment::Alignment;
pub use sfdisk::SfdiskService;

/// One entry of a partition table, in sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub node: String,
    pub number: u32,
    pub start: u64,
    pub size: u64,
}

impl PartitionEntry {
    /// Last sector, inclusive.
    pub fn end(&self) -> u64 {
        (self.start + self.size).saturating_sub(1)
    }

    fn contains(&self, sector: u64) -> bool {
        self.size > 0 && sector >= self.start && sector <= self.end()
    }
}

/// Result of persisting a modified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written and picked up by the kernel
    Committed,
    /// Written, but the kernel refused to re-read an in-use table. Expected
    /// while the root filesystem is mounted; the next boot applies it.
    ExpectedRejection(String),
    UnexpectedError(String),
}

pub trait PartitionTable {
    fn entry(&self, node: &str) -> Result<PartitionEntry>;

    /// Filesystem signature found on the partition, e.g. `ext4`.
    fn fs_type(&self, node: &str) -> Result<Option<String>>;

    fn optimal_alignment(&self) -> Alignment;

    /// Largest end sector the partition can take without moving its start.
    fn max_end(&self, node: &str, alignment: &Alignment) -> Result<u64>;

    fn set_geometry(&mut self, node: &str, start: u64, end: u64) -> Result<()>;

    fn commit(&mut self) -> CommitOutcome;
}

pub trait PartitionTableService {
    fn open(&self, disk: &str) -> Result<Box<dyn PartitionTable + '_>>;
}

/// Highest aligned end sector for `target`, bounded by the next partition,
/// any container partition holding it, and the last usable sector.
///
/// Never returns less than the current end.
pub fn max_end_sector(
    entries: &[PartitionEntry],
    target: &PartitionEntry,
    last_usable: u64,
    alignment: &Alignment,
) -> u64 {
    let mut limit = last_usable;
    for other in entries.iter().filter(|e| e.node != target.node) {
        if other.contains(target.start) {
            // extended partition around a logical one
            limit = limit.min(other.end());
        } else if other.start > target.start {
            limit = limit.min(other.start.saturating_sub(1));
        }
    }

    match alignment.align_end_down(limit) {
        Some(end) if end > target.end() => end,
        _ => target.end(),
    }
}
