mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;

#[test]
fn test_no_flags_exits_cleanly() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_resize_command(&env, &[])?;
    assert_eq!(output.exit_code, 0, "Idle run failed: {}", output.stderr);

    let output = utils::run_resize_command(&env, &["run"])?;
    assert_eq!(output.exit_code, 0, "Idle run failed: {}", output.stderr);

    Ok(())
}

#[test]
fn test_cmdline_token_blocks_resize() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.set_cmdline("root=/dev/sda2 rw nofsresize")?;
    env.touch(".rootfs-repartition")?;

    let output = utils::run_resize_command(&env, &["run"])?;
    assert_eq!(output.exit_code, 2, "stderr: {}", output.stderr);

    // Flags are untouched when blocked
    assert!(env.exists(".rootfs-repartition"));
    assert!(!env.exists(".rootfs-resize"));

    Ok(())
}

#[test]
fn test_cmdline_token_must_match_exactly() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.set_cmdline("root=/dev/sda2 nofsresize=0")?;
    env.touch(".rootfs-repartition")?;

    // Not blocked, so the run proceeds to root resolution
    let output = utils::run_resize_command(&env, &["run", "--dry-run"])?;
    assert_eq!(output.exit_code, 3, "stderr: {}", output.stderr);

    Ok(())
}

#[test]
fn test_no_resize_flag_blocks_resize() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.touch(".nofsresize")?;
    env.touch(".rootfs-resize")?;

    let output = utils::run_resize_command(&env, &["run"])?;
    assert_eq!(output.exit_code, 2, "stderr: {}", output.stderr);
    assert!(env.exists(".rootfs-resize"));

    Ok(())
}

#[test]
fn test_schedule_creates_flags() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_resize_command(&env, &["schedule", "--swap-size", "512"])?;
    assert_eq!(output.exit_code, 0, "Schedule failed: {}", output.stderr);

    assert!(env.exists(".rootfs-repartition"));
    assert!(!env.exists(".rootfs-resize"));
    let swap = utils::read_file(&env.sysroot().join(".swapsize"))?;
    assert_eq!(swap.trim(), "512");

    Ok(())
}

#[test]
fn test_schedule_dry_run_writes_nothing() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_resize_command(&env, &["schedule", "-s", "256", "--dry-run"])?;
    assert_eq!(output.exit_code, 0, "Schedule failed: {}", output.stderr);

    assert!(!env.exists(".rootfs-repartition"));
    assert!(!env.exists(".swapsize"));

    Ok(())
}

#[test]
fn test_status_reports_state() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.touch(".rootfs-repartition")?;
    std::fs::write(env.sysroot().join(".swapsize"), "1024\n")?;

    let output = utils::run_resize_command(&env, &["status"])?;
    assert_eq!(output.exit_code, 0, "Status failed: {}", output.stderr);
    assert!(output.stdout.contains("repartition pending"), "stdout: {}", output.stdout);
    assert!(output.stdout.contains("1024 MiB"), "stdout: {}", output.stdout);

    Ok(())
}

#[test]
fn test_missing_root_mount_exits_three() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.touch(".rootfs-repartition")?;

    let output = utils::run_resize_command(&env, &["run", "--dry-run"])?;
    assert_eq!(output.exit_code, 3, "stderr: {}", output.stderr);
    assert!(env.exists(".rootfs-repartition"));
    assert!(!env.exists(".rootfs-resize"));

    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    std::fs::write(env.config_path(), "tools = \"not a table\"\n")?;

    let output = utils::run_resize_command(&env, &["status"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("config"), "stderr: {}", output.stderr);

    Ok(())
}
