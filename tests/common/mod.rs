use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway sysroot with its own config, kernel command line and mount table.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let env = Self { temp_dir };

        fs::create_dir_all(env.sysroot().join("etc"))?;
        fs::write(env.sysroot().join("etc/fstab"), "")?;
        env.set_cmdline("BOOT_IMAGE=/boot/vmlinuz root=/dev/mmcblk0p2 rw quiet")?;
        // no entry for / so phases stop at root resolution
        env.set_mountinfo("23 28 0:21 / /proc rw,nosuid - proc proc rw\n")?;

        let config = format!(
            "cmdline_path = \"{}\"\nmountinfo_path = \"{}\"\n",
            env.cmdline_path().display(),
            env.mountinfo_path().display()
        );
        fs::write(env.config_path(), config)?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn sysroot(&self) -> PathBuf {
        self.path().join("root")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("rootfs-resize.toml")
    }

    pub fn cmdline_path(&self) -> PathBuf {
        self.path().join("cmdline")
    }

    pub fn mountinfo_path(&self) -> PathBuf {
        self.path().join("mountinfo")
    }

    pub fn set_cmdline(&self, cmdline: &str) -> Result<()> {
        fs::write(self.cmdline_path(), format!("{cmdline}\n"))?;
        Ok(())
    }

    pub fn set_mountinfo(&self, content: &str) -> Result<()> {
        fs::write(self.mountinfo_path(), content)?;
        Ok(())
    }

    /// Create a file relative to the sysroot
    pub fn touch(&self, name: &str) -> Result<()> {
        fs::write(self.sysroot().join(name), "")?;
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.sysroot().join(name).exists()
    }
}
