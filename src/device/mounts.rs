use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Kernel device number of a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNumber {
    pub major: u64,
    pub minor: u64,
}

impl DeviceNumber {
    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    pub fn from_rdev(rdev: u64) -> Self {
        Self::new(nix::sys::stat::major(rdev), nix::sys::stat::minor(rdev))
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

impl FromStr for DeviceNumber {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (major, minor) = s
            .split_once(':')
            .with_context(|| format!("device number '{}' is not major:minor", s))?;
        Ok(Self {
            major: major.parse().context("parsing major device number")?,
            minor: minor.parse().context("parsing minor device number")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: DeviceNumber,
    pub mount_point: String,
    pub fs_type: String,
    pub source: String,
}

pub trait MountTableReader {
    fn entries(&self) -> Result<Vec<MountEntry>>;

    /// The mount behind `/`. The last entry wins when mounts are stacked.
    fn root_entry(&self) -> Result<Option<MountEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .rev()
            .find(|entry| entry.mount_point == "/"))
    }
}

/// Reads `/proc/self/mountinfo` (or any file in that format).
pub struct ProcMountTable {
    path: PathBuf,
}

impl ProcMountTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MountTableReader for ProcMountTable {
    fn entries(&self) -> Result<Vec<MountEntry>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading mount table {}", self.path.display()))?;
        parse_mountinfo(&content)
    }
}

pub fn parse_mountinfo(input: &str) -> Result<Vec<MountEntry>> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_mountinfo_line)
        .collect()
}

fn parse_mountinfo_line(line: &str) -> Result<MountEntry> {
    let (left, right) = line
        .split_once(" - ")
        .with_context(|| format!("invalid mountinfo line: {}", line))?;

    let left_fields: Vec<&str> = left.split_whitespace().collect();
    if left_fields.len() < 5 {
        anyhow::bail!("invalid mountinfo line: {}", line);
    }

    let mut right_fields = right.split_whitespace();
    let fs_type = right_fields.next().unwrap_or_default();
    let source = right_fields.next().unwrap_or_default();

    Ok(MountEntry {
        device: left_fields[2]
            .parse()
            .with_context(|| format!("invalid mountinfo line: {}", line))?,
        mount_point: unescape_mount_field(left_fields[4]),
        fs_type: fs_type.to_string(),
        source: unescape_mount_field(source),
    })
}

/// Undo the kernel's octal escaping (`\040` for a space).
fn unescape_mount_field(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..=index + 3].iter().all(u8::is_ascii_digit)
        {
            if let Ok(num) = u8::from_str_radix(&value[index + 1..index + 4], 8) {
                output.push(num);
                index += 4;
                continue;
            }
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&output).into_owned()
}
