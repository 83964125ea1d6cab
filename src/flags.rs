//! Flag files: persistent boot-time state encoded as file presence.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Administrator opt-out
    NoResize,
    /// Phase 1 has not run yet
    RepartitionPending,
    /// Phase 1 ran, the filesystem still needs to grow
    ResizePending,
    /// Requested swap file size in megabytes
    SwapSize,
}

impl Flag {
    pub fn path(&self) -> &'static str {
        match self {
            Flag::NoResize => paths::NO_RESIZE_FLAG,
            Flag::RepartitionPending => paths::REPARTITION_FLAG,
            Flag::ResizePending => paths::RESIZE_FLAG,
            Flag::SwapSize => paths::SWAP_SIZE_FLAG,
        }
    }
}

pub trait FlagFileStore {
    fn exists(&self, flag: Flag) -> bool;

    /// Create an empty flag file. Existing files are left as they are.
    fn create(&self, flag: Flag) -> Result<()>;

    /// Remove a flag file. Removing an absent flag is not an error.
    fn remove(&self, flag: Flag) -> Result<()>;

    /// First line of the flag file, `None` when it does not exist.
    fn read_first_line(&self, flag: Flag) -> Result<Option<String>>;

    /// Replace the flag file's content.
    fn write(&self, flag: Flag, content: &str) -> Result<()>;
}

/// Flag files stored on a mounted filesystem below `sysroot`.
pub struct FsFlagStore {
    sysroot: PathBuf,
    dry_run: bool,
}

impl FsFlagStore {
    pub fn new(sysroot: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            sysroot: sysroot.into(),
            dry_run,
        }
    }

    pub fn flag_path(&self, flag: Flag) -> PathBuf {
        paths::under_root(&self.sysroot, flag.path())
    }
}

impl FlagFileStore for FsFlagStore {
    fn exists(&self, flag: Flag) -> bool {
        self.flag_path(flag).exists()
    }

    fn create(&self, flag: Flag) -> Result<()> {
        let path = self.flag_path(flag);
        if self.dry_run {
            info!("[DRY RUN] touch {}", path.display());
            return Ok(());
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("creating flag file {}", path.display()))?;
        debug!(flag = %path.display(), "flag created");
        Ok(())
    }

    fn remove(&self, flag: Flag) -> Result<()> {
        let path = self.flag_path(flag);
        if self.dry_run {
            info!("[DRY RUN] rm -f {}", path.display());
            return Ok(());
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(flag = %path.display(), "flag removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing flag file {}", path.display())),
        }
    }

    fn read_first_line(&self, flag: Flag) -> Result<Option<String>> {
        let path = self.flag_path(flag);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content.lines().next().unwrap_or("").to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading flag file {}", path.display())),
        }
    }

    fn write(&self, flag: Flag, content: &str) -> Result<()> {
        let path = self.flag_path(flag);
        if self.dry_run {
            info!("[DRY RUN] echo '{}' > {}", content, path.display());
            return Ok(());
        }
        fs::write(&path, format!("{content}\n"))
            .with_context(|| format!("writing flag file {}", path.display()))
    }
}
