use std::fs;
use std::path::Path;

use tracing::debug;

const MIB: u64 = 1024 * 1024;

/// Sector alignment rule: boundaries sit at `offset + k * grain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub offset: u64,
    pub grain: u64,
}

impl Alignment {
    /// Device-optimal alignment from the kernel's I/O topology hints.
    ///
    /// A 1 MiB grain is used unless the device reports an optimal I/O size
    /// that does not divide 1 MiB.
    pub fn optimal(sector_size: u64, optimal_io_size: u64, alignment_offset: u64) -> Self {
        let sector_size = sector_size.max(1);
        let grain_bytes = if optimal_io_size == 0 || MIB % optimal_io_size == 0 {
            MIB
        } else {
            optimal_io_size
        };
        Self {
            offset: alignment_offset / sector_size,
            grain: (grain_bytes / sector_size).max(1),
        }
    }

    /// Largest end sector `<= limit` whose following sector starts a grain.
    pub fn align_end_down(&self, limit: u64) -> Option<u64> {
        let grain = self.grain.max(1);
        let base = limit.checked_add(1)?.checked_sub(self.offset)?;
        (base / grain * grain + self.offset).checked_sub(1)
    }

    /// Read the topology of `disk` (e.g. `mmcblk0`) from sysfs.
    pub fn from_sysfs(sys_block: &Path, disk: &str, sector_size: u64) -> Self {
        let dir = sys_block.join(disk);
        let optimal_io_size = read_number(&dir.join("queue/optimal_io_size"));
        let alignment_offset = read_number(&dir.join("alignment_offset"));
        let alignment = Self::optimal(sector_size, optimal_io_size, alignment_offset);
        debug!(
            disk,
            optimal_io_size, alignment_offset, grain = alignment.grain, "device alignment"
        );
        alignment
    }
}

fn read_number(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
