//! Partition table access through `sfdisk`, `blkid` and `blockdev`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use super::{Alignment, CommitOutcome, PartitionEntry, PartitionTable, PartitionTableService};
use crate::config::ToolsConfig;
use crate::executor::CommandExecutor;

#[derive(Debug, Deserialize)]
pub struct SfdiskOutput {
    pub partitiontable: SfdiskPartitionTable,
}

#[derive(Debug, Deserialize)]
pub struct SfdiskPartitionTable {
    pub label: String,
    pub lastlba: Option<u64>,
    #[serde(default = "default_sector_size")]
    pub sectorsize: u64,
    #[serde(default)]
    pub partitions: Vec<SfdiskPartition>,
}

#[derive(Debug, Deserialize)]
pub struct SfdiskPartition {
    pub node: String,
    pub start: u64,
    pub size: u64,
}

fn default_sector_size() -> u64 {
    512
}

/// Parse `sfdisk -J` output into table entries.
pub fn parse_sfdisk_json(json: &str) -> Result<(SfdiskPartitionTable, Vec<PartitionEntry>)> {
    let output: SfdiskOutput =
        serde_json::from_str(json).context("Failed to parse sfdisk JSON output")?;
    let table = output.partitiontable;

    let entries = table
        .partitions
        .iter()
        .map(|p| {
            let number = trailing_number(&p.node)
                .with_context(|| format!("no partition number in node {}", p.node))?;
            Ok(PartitionEntry {
                node: p.node.clone(),
                number,
                start: p.start,
                size: p.size,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((table, entries))
}

fn trailing_number(node: &str) -> Option<u32> {
    let digits = node.len() - node.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    node[node.len() - digits..].parse().ok()
}

pub struct SfdiskService<'a> {
    executor: &'a CommandExecutor,
    tools: &'a ToolsConfig,
    sys_block: PathBuf,
}

impl<'a> SfdiskService<'a> {
    pub fn new(
        executor: &'a CommandExecutor,
        tools: &'a ToolsConfig,
        sys_block: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            tools,
            sys_block: sys_block.into(),
        }
    }
}

impl PartitionTableService for SfdiskService<'_> {
    fn open(&self, disk: &str) -> Result<Box<dyn PartitionTable + '_>> {
        let output = Command::new(&self.tools.sfdisk)
            .args(["-J", disk])
            .output()
            .context("Failed to run sfdisk -J")?;
        if !output.status.success() {
            anyhow::bail!(
                "sfdisk could not read the partition table of {}: {}",
                disk,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let (table, entries) = parse_sfdisk_json(&String::from_utf8_lossy(&output.stdout))?;
        let disk_name = disk.strip_prefix("/dev/").unwrap_or(disk).to_string();

        let last_usable = match table.lastlba {
            Some(lba) => lba,
            // DOS labels carry no last LBA; use the device size
            None => disk_sectors(&self.sys_block, &disk_name, table.sectorsize)?
                .checked_sub(1)
                .with_context(|| format!("{} reports zero size", disk))?,
        };

        debug!(
            disk,
            label = %table.label,
            partitions = entries.len(),
            last_usable,
            "read partition table"
        );

        Ok(Box::new(SfdiskTable {
            service: self,
            disk: disk.to_string(),
            disk_name,
            sector_size: table.sectorsize,
            last_usable,
            entries,
            pending: None,
        }))
    }
}

/// Disk size in `sector_size` units, from sysfs (which counts 512-byte sectors).
fn disk_sectors(sys_block: &Path, disk_name: &str, sector_size: u64) -> Result<u64> {
    let path = sys_block.join(disk_name).join("size");
    let content =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let sectors_512: u64 = content
        .trim()
        .parse()
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(sectors_512 * 512 / sector_size.max(1))
}

struct SfdiskTable<'a> {
    service: &'a SfdiskService<'a>,
    disk: String,
    disk_name: String,
    sector_size: u64,
    last_usable: u64,
    entries: Vec<PartitionEntry>,
    pending: Option<PartitionEntry>,
}

impl PartitionTable for SfdiskTable<'_> {
    fn entry(&self, node: &str) -> Result<PartitionEntry> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .cloned()
            .with_context(|| format!("{} has no partition entry for {}", self.disk, node))
    }

    fn fs_type(&self, node: &str) -> Result<Option<String>> {
        let output = Command::new(&self.service.tools.blkid)
            .args(["-o", "value", "-s", "TYPE", node])
            .output()
            .context("Failed to run blkid")?;
        // blkid exits 2 when no signature was found
        let fs_type = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!fs_type.is_empty()).then_some(fs_type))
    }

    fn optimal_alignment(&self) -> Alignment {
        Alignment::from_sysfs(&self.service.sys_block, &self.disk_name, self.sector_size)
    }

    fn max_end(&self, node: &str, alignment: &Alignment) -> Result<u64> {
        let target = self.entry(node)?;
        Ok(super::max_end_sector(
            &self.entries,
            &target,
            self.last_usable,
            alignment,
        ))
    }

    fn set_geometry(&mut self, node: &str, start: u64, end: u64) -> Result<()> {
        if end < start {
            anyhow::bail!("end sector {} lies before start sector {}", end, start);
        }
        if end > self.last_usable {
            anyhow::bail!("end sector {} lies beyond the disk ({})", end, self.last_usable);
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.node == node)
            .with_context(|| format!("{} has no partition entry for {}", self.disk, node))?;
        entry.start = start;
        entry.size = end - start + 1;
        self.pending = Some(entry.clone());
        Ok(())
    }

    fn commit(&mut self) -> CommitOutcome {
        let Some(entry) = self.pending.take() else {
            return CommitOutcome::Committed;
        };
        let executor = self.service.executor;
        let tools = self.service.tools;

        let script = format!("start={}, size={}\n", entry.start, entry.size);
        let write = executor.run_with_input(
            Command::new(&tools.sfdisk)
                .args(["--force", "--no-reread", "-N"])
                .arg(entry.number.to_string())
                .arg(&self.disk),
            &script,
        );
        if let Err(e) = write {
            return CommitOutcome::UnexpectedError(format!("{:#}", e));
        }
        info!(disk = %self.disk, node = %entry.node, end = entry.end(), "partition table written");

        let reread = executor.output(
            Command::new(&tools.blockdev)
                .arg("--rereadpt")
                .arg(&self.disk),
        );
        classify_reread(reread)
    }
}

fn classify_reread(result: Result<Option<std::process::Output>>) -> CommitOutcome {
    match result {
        Ok(None) => CommitOutcome::Committed,
        Ok(Some(output)) if output.status.success() => CommitOutcome::Committed,
        Ok(Some(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.to_lowercase().contains("busy") {
                CommitOutcome::ExpectedRejection(stderr)
            } else {
                CommitOutcome::UnexpectedError(format!(
                    "re-reading partition table failed: {}",
                    stderr
                ))
            }
        }
        Err(e) => CommitOutcome::UnexpectedError(format!("{:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    const GPT_JSON: &str = r#"{
   "partitiontable": {
      "label": "gpt",
      "id": "6A8B0E6C-3B3D-4F0A-9C1D-2B8E3C5D7F10",
      "device": "/dev/sda",
      "unit": "sectors",
      "firstlba": 34,
      "lastlba": 33554398,
      "sectorsize": 512,
      "partitions": [
         {"node": "/dev/sda1", "start": 2048, "size": 524288, "type": "C12A7328-F81F-11D2-BA4B-00A0C93EC93B"},
         {"node": "/dev/sda2", "start": 526336, "size": 4194304, "type": "0FC63DAF-8483-4772-8E47-3D69D8477DE4"}
      ]
   }
}"#;

    const DOS_JSON: &str = r#"{
   "partitiontable": {
      "label": "dos",
      "id": "0x3b3d4f0a",
      "device": "/dev/mmcblk0",
      "unit": "sectors",
      "sectorsize": 512,
      "partitions": [
         {"node": "/dev/mmcblk0p1", "start": 8192, "size": 524288, "type": "c"},
         {"node": "/dev/mmcblk0p2", "start": 532480, "size": 3653632, "type": "83"}
      ]
   }
}"#;

    #[test]
    fn parses_gpt_table() {
        let (table, entries) = parse_sfdisk_json(GPT_JSON).unwrap();
        assert_eq!(table.label, "gpt");
        assert_eq!(table.lastlba, Some(33554398));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].number, 2);
        assert_eq!(entries[1].end(), 4720639);
    }

    #[test]
    fn parses_dos_table_with_mmc_nodes() {
        let (table, entries) = parse_sfdisk_json(DOS_JSON).unwrap();
        assert_eq!(table.label, "dos");
        assert_eq!(table.lastlba, None);
        assert_eq!(entries[1].node, "/dev/mmcblk0p2");
        assert_eq!(entries[1].number, 2);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_sfdisk_json("not json").is_err());
    }

    #[test]
    fn trailing_number_reads_suffix() {
        assert_eq!(trailing_number("/dev/sdb12"), Some(12));
        assert_eq!(trailing_number("/dev/mmcblk0p3"), Some(3));
        assert_eq!(trailing_number("/dev/sdb"), None);
    }

    #[test]
    fn disk_sectors_scales_to_sector_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sda")).unwrap();
        fs::write(dir.path().join("sda/size"), "33554432\n").unwrap();

        assert_eq!(disk_sectors(dir.path(), "sda", 512).unwrap(), 33554432);
        assert_eq!(disk_sectors(dir.path(), "sda", 4096).unwrap(), 4194304);
    }

    fn output(code: i32, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn busy_reread_is_expected_rejection() {
        let outcome = classify_reread(Ok(Some(output(
            1,
            "blockdev: ioctl error on BLKRRPART: Device or resource busy\n",
        ))));
        assert!(matches!(outcome, CommitOutcome::ExpectedRejection(_)));
    }

    #[test]
    fn other_reread_failures_are_unexpected() {
        let outcome = classify_reread(Ok(Some(output(
            1,
            "blockdev: cannot open /dev/sdz: No such file",
        ))));
        assert!(matches!(outcome, CommitOutcome::UnexpectedError(_)));
    }

    #[test]
    fn successful_or_dry_reread_is_committed() {
        assert_eq!(classify_reread(Ok(Some(output(0, "")))), CommitOutcome::Committed);
        assert_eq!(classify_reread(Ok(None)), CommitOutcome::Committed);
    }

    #[test]
    fn commit_without_changes_is_a_no_op() {
        let executor = CommandExecutor::new(false);
        let tools = ToolsConfig::default();
        let service = SfdiskService::new(&executor, &tools, "/sys/block");
        let (_, entries) = parse_sfdisk_json(GPT_JSON).unwrap();
        let mut table = SfdiskTable {
            service: &service,
            disk: "/dev/sda".into(),
            disk_name: "sda".into(),
            sector_size: 512,
            last_usable: 33554398,
            entries,
            pending: None,
        };

        assert!(table.set_geometry("/dev/sda2", 526336, 40_000_000).is_err());
        assert!(table.set_geometry("/dev/sda9", 526336, 1_000_000).is_err());
        assert_eq!(table.commit(), CommitOutcome::Committed);
    }

    #[test]
    fn dry_run_commit_reports_committed() {
        let executor = CommandExecutor::new(true);
        let tools = ToolsConfig::default();
        let service = SfdiskService::new(&executor, &tools, "/sys/block");
        let (_, entries) = parse_sfdisk_json(GPT_JSON).unwrap();
        let mut table = SfdiskTable {
            service: &service,
            disk: "/dev/sda".into(),
            disk_name: "sda".into(),
            sector_size: 512,
            last_usable: 33554398,
            entries,
            pending: None,
        };

        let end = table.max_end("/dev/sda2", &Alignment::optimal(512, 0, 0)).unwrap();
        table.set_geometry("/dev/sda2", 526336, end).unwrap();
        assert_eq!(table.entry("/dev/sda2").unwrap().end(), 33552383);
        assert_eq!(table.commit(), CommitOutcome::Committed);
    }
}
