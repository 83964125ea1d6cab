use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Runtime configuration, read from `/etc/rootfs-resize.toml` when present.
///
/// Every field has a default so an empty or missing file behaves exactly like
/// a stock install.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Root that flag files, the swap file and fstab are resolved against
    pub sysroot: PathBuf,
    pub cmdline_path: PathBuf,
    pub mountinfo_path: PathBuf,
    pub swap_file: PathBuf,
    pub fstab: PathBuf,
    pub tools: ToolsConfig,
    /// Optional file that receives a copy of the log output
    pub log_file: Option<PathBuf>,
}

/// Commands used for the steps this program delegates to the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub resize_tool: String,
    pub mkswap: String,
    pub swapon: String,
    pub ionice: String,
    pub sfdisk: String,
    pub blkid: String,
    pub blockdev: String,
    /// Full reboot command line, program first
    pub reboot: Vec<String>,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            sysroot: PathBuf::from("/"),
            cmdline_path: PathBuf::from(paths::CMDLINE),
            mountinfo_path: PathBuf::from(paths::MOUNTINFO),
            swap_file: PathBuf::from(paths::SWAP_FILE),
            fstab: PathBuf::from(paths::FSTAB),
            tools: ToolsConfig::default(),
            log_file: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            resize_tool: "resize2fs".to_string(),
            mkswap: "mkswap".to_string(),
            swapon: "swapon".to_string(),
            ionice: "ionice".to_string(),
            sfdisk: "sfdisk".to_string(),
            blkid: "blkid".to_string(),
            blockdev: "blockdev".to_string(),
            reboot: vec!["reboot".to_string(), "-f".to_string()],
        }
    }
}

impl ResizeConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let tools = &self.tools;
        let named = [
            ("resize_tool", &tools.resize_tool),
            ("mkswap", &tools.mkswap),
            ("swapon", &tools.swapon),
            ("ionice", &tools.ionice),
            ("sfdisk", &tools.sfdisk),
            ("blkid", &tools.blkid),
            ("blockdev", &tools.blockdev),
        ];
        for (key, value) in named {
            if value.trim().is_empty() {
                anyhow::bail!("tools.{} must not be empty", key);
            }
        }
        if tools.reboot.first().is_none_or(|program| program.trim().is_empty()) {
            anyhow::bail!("tools.reboot must name a program");
        }
        if !self.swap_file.is_absolute() || !self.fstab.is_absolute() {
            anyhow::bail!("swap_file and fstab must be absolute paths");
        }
        Ok(())
    }

    /// Resolve a system path (flag file, fstab, swap file) under the sysroot.
    pub fn system_path(&self, path: impl AsRef<Path>) -> PathBuf {
        paths::under_root(&self.sysroot, path)
    }

    pub fn swap_file_path(&self) -> PathBuf {
        self.system_path(&self.swap_file)
    }

    pub fn fstab_path(&self) -> PathBuf {
        self.system_path(&self.fstab)
    }
}
