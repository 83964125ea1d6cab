//! Fixtures shared by the phase and state tests.

use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::device::RootDevice;
use crate::device::mounts::DeviceNumber;
use crate::partition::{
    Alignment, CommitOutcome, PartitionEntry, PartitionTable, PartitionTableService,
    max_end_sector,
};
use crate::tools::{Rebooter, SystemTools};

pub fn sd_root() -> RootDevice {
    RootDevice {
        device: DeviceNumber::new(8, 2),
        node: "/dev/sda2".into(),
        disk: "/dev/sda".into(),
        partition_number: 2,
    }
}

/// In-memory partition table for `/dev/sda` with a boot and a root partition.
pub struct FakePartitions {
    pub entries: Vec<PartitionEntry>,
    pub last_usable: u64,
    pub fs_type: Option<String>,
    pub commit: CommitOutcome,
    pub fail_open: bool,
    pub written: RefCell<Vec<PartitionEntry>>,
}

impl FakePartitions {
    pub fn new(root_size: u64) -> Self {
        Self {
            entries: vec![
                PartitionEntry {
                    node: "/dev/sda1".into(),
                    number: 1,
                    start: 2048,
                    size: 524288,
                },
                PartitionEntry {
                    node: "/dev/sda2".into(),
                    number: 2,
                    start: 526336,
                    size: root_size,
                },
            ],
            last_usable: 33554398,
            fs_type: Some("ext4".into()),
            commit: CommitOutcome::ExpectedRejection("Device or resource busy".into()),
            fail_open: false,
            written: RefCell::new(Vec::new()),
        }
    }
}

struct FakeTable<'a> {
    source: &'a FakePartitions,
    entries: Vec<PartitionEntry>,
}

impl PartitionTableService for FakePartitions {
    fn open(&self, disk: &str) -> Result<Box<dyn PartitionTable + '_>> {
        if self.fail_open || disk != "/dev/sda" {
            anyhow::bail!("cannot open {}", disk);
        }
        Ok(Box::new(FakeTable {
            source: self,
            entries: self.entries.clone(),
        }))
    }
}

impl PartitionTable for FakeTable<'_> {
    fn entry(&self, node: &str) -> Result<PartitionEntry> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no entry for {}", node))
    }

    fn fs_type(&self, _node: &str) -> Result<Option<String>> {
        Ok(self.source.fs_type.clone())
    }

    fn optimal_alignment(&self) -> Alignment {
        Alignment::optimal(512, 0, 0)
    }

    fn max_end(&self, node: &str, alignment: &Alignment) -> Result<u64> {
        let target = self.entry(node)?;
        Ok(max_end_sector(
            &self.entries,
            &target,
            self.source.last_usable,
            alignment,
        ))
    }

    fn set_geometry(&mut self, node: &str, start: u64, end: u64) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.node == node)
            .ok_or_else(|| anyhow::anyhow!("no entry for {}", node))?;
        entry.start = start;
        entry.size = end - start + 1;
        Ok(())
    }

    fn commit(&mut self) -> CommitOutcome {
        self.source
            .written
            .borrow_mut()
            .extend(self.entries.iter().cloned());
        self.source.commit.clone()
    }
}

#[derive(Default)]
pub struct RecordingRebooter {
    pub calls: Cell<usize>,
}

impl Rebooter for RecordingRebooter {
    fn reboot(&self) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTools {
    pub grown: RefCell<Vec<String>>,
    pub formatted: RefCell<Vec<PathBuf>>,
    pub activations: Cell<usize>,
    pub fail_format: bool,
}

impl SystemTools for RecordingTools {
    fn grow_filesystem(&self, node: &str) -> bool {
        self.grown.borrow_mut().push(node.to_string());
        true
    }

    fn lower_io_priority(&self) {}

    fn format_swap(&self, path: &Path) -> Result<()> {
        self.formatted.borrow_mut().push(path.to_path_buf());
        if self.fail_format {
            anyhow::bail!("mkswap: {}: not enough space", path.display());
        }
        Ok(())
    }

    fn activate_swap(&self) -> bool {
        self.activations.set(self.activations.get() + 1);
        true
    }
}
