use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ResizeError;
use crate::flags::{Flag, FlagFileStore};
use crate::paths::NO_RESIZE_TOKEN;

/// Whether the kernel command line carries the opt-out token.
pub fn cmdline_blocks(cmdline: &str) -> bool {
    cmdline.split_whitespace().any(|token| token == NO_RESIZE_TOKEN)
}

pub fn read_cmdline(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read kernel command line {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Refuse to go on when resizing was disabled for this boot.
pub fn check(cmdline: &str, flags: &dyn FlagFileStore) -> Result<(), ResizeError> {
    if cmdline_blocks(cmdline) {
        return Err(ResizeError::BlockedByPolicy(format!(
            "'{}' on the kernel command line",
            NO_RESIZE_TOKEN
        )));
    }
    if flags.exists(Flag::NoResize) {
        return Err(ResizeError::BlockedByPolicy(format!(
            "{} exists",
            Flag::NoResize.path()
        )));
    }
    debug!("no resize policy block in effect");
    Ok(())
}
