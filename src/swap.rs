//! Swap file provisioning: staged creation, fstab registration.

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::paths;
use crate::tools::SystemTools;

/// Swap sizes are requested in megabytes of this many bytes.
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Parse a swap request. Anything that is not a whole number means no swap.
pub fn parse_swap_size(line: &str) -> u64 {
    line.trim().parse().unwrap_or(0)
}

/// Create a swap file of `size_mb` megabytes at `final_path`.
///
/// The file is filled and formatted under a staging name and only renamed
/// into place once both succeeded, so `final_path` never names a partially
/// initialized file.
pub fn create_swap_file(
    final_path: &Path,
    size_mb: u64,
    tools: &dyn SystemTools,
    dry_run: bool,
) -> Result<()> {
    let staging = paths::staging_path(final_path);
    if dry_run {
        info!(
            "[DRY RUN] create {} MiB swap at {} via {}",
            size_mb,
            final_path.display(),
            staging.display()
        );
        return Ok(());
    }

    tools.lower_io_priority();

    let result = fill_file(&staging, size_mb)
        .and_then(|()| tools.format_swap(&staging))
        .and_then(|()| {
            fs::rename(&staging, final_path).with_context(|| {
                format!("renaming {} to {}", staging.display(), final_path.display())
            })
        });

    if result.is_err() {
        if let Err(e) = fs::remove_file(&staging) {
            debug!("could not remove {}: {}", staging.display(), e);
        }
    }
    result?;

    info!(path = %final_path.display(), size_mb, "swap file created");
    Ok(())
}

/// Write `size_mb` blocks of zeros to `path`, replacing any previous content.
fn fill_file(path: &Path, size_mb: u64) -> Result<()> {
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let block = vec![0u8; BLOCK_SIZE];
    let mut writer = BufWriter::with_capacity(BLOCK_SIZE, file);
    for _ in 0..size_mb {
        writer
            .write_all(&block)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("flushing {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing {}", path.display()))?;
    Ok(())
}

/// Fstab line registering `swap_path`.
pub fn fstab_line(swap_path: &Path) -> String {
    format!("{} none swap sw 0 0", swap_path.display())
}

/// Whether any fstab line already mentions `swap_path`.
pub fn fstab_references(content: &str, swap_path: &Path) -> bool {
    let needle = swap_path.to_string_lossy();
    content.lines().any(|line| line.contains(needle.as_ref()))
}

/// Append the swap entry to `fstab` unless a line already references it.
///
/// Returns whether the file was changed.
pub fn ensure_fstab_entry(fstab: &Path, swap_path: &Path, dry_run: bool) -> Result<bool> {
    let content = match fs::read_to_string(fstab) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} does not exist, creating it", fstab.display());
            String::new()
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", fstab.display())),
    };

    if fstab_references(&content, swap_path) {
        debug!("{} already references {}", fstab.display(), swap_path.display());
        return Ok(false);
    }

    let line = fstab_line(swap_path);
    if dry_run {
        info!("[DRY RUN] echo '{}' >> {}", line, fstab.display());
        return Ok(true);
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(fstab)
        .with_context(|| format!("opening {}", fstab.display()))?;
    let separator = if content.is_empty() || content.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{line}")
        .with_context(|| format!("appending to {}", fstab.display()))?;
    info!("registered {} in {}", swap_path.display(), fstab.display());
    Ok(true)
}
