use std::process::{Command, Output, Stdio};

use tracing::{info, warn};

/// Runs external commands, or only prints them in dry-run mode.
pub struct CommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run(&self, command: &mut Command) -> anyhow::Result<()> {
        if self.dry_run {
            self.print_dry_run(command, None);
            Ok(())
        } else {
            let status = command.status()?;
            if !status.success() {
                anyhow::bail!("Command failed ({}): {}", status, describe(command));
            }
            Ok(())
        }
    }

    pub fn run_with_input(&self, command: &mut Command, input: &str) -> anyhow::Result<()> {
        if self.dry_run {
            self.print_dry_run(command, Some(input));
            Ok(())
        } else {
            use std::io::Write;
            command.stdin(Stdio::piped());
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());

            let mut child = command.spawn()?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }

            let output = child.wait_with_output()?;
            if !output.status.success() {
                anyhow::bail!(
                    "Command failed ({}): {}: {}",
                    output.status,
                    describe(command),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(())
        }
    }

    /// Run and capture output without judging the exit status.
    ///
    /// Returns `None` in dry-run mode.
    pub fn output(&self, command: &mut Command) -> anyhow::Result<Option<Output>> {
        if self.dry_run {
            self.print_dry_run(command, None);
            Ok(None)
        } else {
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
            Ok(Some(command.output()?))
        }
    }

    /// Run a command whose failure must not stop the caller.
    pub fn run_best_effort(&self, command: &mut Command) -> bool {
        match self.run(command) {
            Ok(()) => true,
            Err(e) => {
                warn!("{:#}", e);
                false
            }
        }
    }

    fn print_dry_run(&self, command: &Command, input: Option<&str>) {
        let cmd_str = describe(command);

        match input {
            Some(input_str) if input_str.contains('\n') => {
                info!("[DRY RUN] {} <<EOF\n{}\nEOF", cmd_str, input_str.trim());
            }
            Some(input_str) => {
                info!("[DRY RUN] echo '{}' | {}", input_str, cmd_str);
            }
            None => info!("[DRY RUN] {}", cmd_str),
        }
    }
}

/// Render a command the way it would be typed in a shell.
pub fn describe(command: &Command) -> String {
    let program = command.get_program().to_string_lossy();
    let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy()).collect();
    if args.is_empty() {
        program.into_owned()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
