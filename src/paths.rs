use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "/etc/rootfs-resize.toml";
pub const DRY_RUN_FLAG: &str = "/etc/rootfs-resize.dryrun";

pub const CMDLINE: &str = "/proc/cmdline";
pub const MOUNTINFO: &str = "/proc/self/mountinfo";
pub const SYS_BLOCK: &str = "/sys/block";

pub const NO_RESIZE_FLAG: &str = "/.nofsresize";
pub const REPARTITION_FLAG: &str = "/.rootfs-repartition";
pub const RESIZE_FLAG: &str = "/.rootfs-resize";
pub const SWAP_SIZE_FLAG: &str = "/.swapsize";

pub const SWAP_FILE: &str = "/swapfile";
pub const FSTAB: &str = "/etc/fstab";

/// Kernel command line token that disables resizing for this boot.
pub const NO_RESIZE_TOKEN: &str = "nofsresize";

/// Join an absolute system path onto a sysroot.
pub fn under_root(sysroot: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("/") {
        Ok(relative) => sysroot.join(relative),
        Err(_) => sysroot.join(path),
    }
}

/// Staging name used while a swap file is being initialized.
pub fn staging_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
