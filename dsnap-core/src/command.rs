// Standard library
use std::ffi::OsStr;
use std::thread;
use std::time::{Duration, Instant};

// External crates
use crate::error::{Result, SnapError};
use duct::cmd;
use tracing::debug;
use which::which;

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Last non-empty stderr line, which is where gcloud puts its error summary.
    pub fn error_summary(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("no error output")
            .to_string()
    }
}

/// Render a command line the way a user would type it in a shell.
pub fn render_command<A: AsRef<OsStr>>(command: &str, args: &[A]) -> String {
    let mut parts = vec![shell_quote(command)];
    parts.extend(
        args.iter()
            .map(|a| shell_quote(&a.as_ref().to_string_lossy())),
    );
    parts.join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=.,/:@%+()".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Run a command to completion and capture both streams.
///
/// A non-zero exit is not an error here; callers inspect `success` because a
/// failed `describe` is how the cloud CLI reports "not found".
pub fn run_capture<A: AsRef<OsStr>>(
    command: &str,
    args: &[A],
    timeout_secs: Option<u64>,
) -> Result<CommandOutput> {
    let full_command = render_command(command, args);
    debug!("Running: {}", full_command);

    let expression = cmd(command, args)
        .stdout_capture()
        .stderr_capture()
        .unchecked();

    let output = match timeout_secs {
        None => expression.run().map_err(|e| {
            SnapError::Command(format!("Failed to start '{}': {}", full_command, e))
        })?,
        Some(secs) => {
            let handle = expression.start().map_err(|e| {
                SnapError::Command(format!("Failed to start '{}': {}", full_command, e))
            })?;

            let start = Instant::now();
            let timeout = Duration::from_secs(secs);

            loop {
                if start.elapsed() >= timeout {
                    let _ = handle.kill();
                    return Err(SnapError::Timeout(format!(
                        "Command timed out after {}s: {}",
                        secs, full_command
                    )));
                }

                match handle.try_wait() {
                    Ok(Some(output)) => break output.clone(),
                    Ok(None) => thread::sleep(Duration::from_millis(100)),
                    Err(e) => {
                        return Err(SnapError::Command(format!(
                            "Error waiting for '{}': {}",
                            full_command, e
                        )));
                    }
                }
            }
        }
    };

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Checks if a command-line tool is available in the system's PATH.
pub fn is_tool_installed(tool_name: &str) -> bool {
    which(tool_name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_quotes_only_when_needed() {
        let rendered = render_command(
            "gcloud",
            &["compute", "--description", "disk web-01 at 01-02-2024", "--labels=a=b,c=d"],
        );
        assert_eq!(
            rendered,
            "gcloud compute --description 'disk web-01 at 01-02-2024' --labels=a=b,c=d"
        );
    }

    #[test]
    fn test_render_command_escapes_single_quotes() {
        assert_eq!(render_command("echo", &["it's"]), r"echo 'it'\''s'");
        assert_eq!(render_command("echo", &[""]), "echo ''");
    }

    #[test]
    fn test_error_summary_uses_last_stderr_line() {
        let output = CommandOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: "WARNING: something\nERROR: (gcloud) resource not found\n\n".into(),
        };
        assert_eq!(output.error_summary(), "ERROR: (gcloud) resource not found");
        assert_eq!(CommandOutput::default().error_summary(), "no error output");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_capture_reports_failure_without_erroring() {
        let output = run_capture("sh", &["-c", "echo out; echo err >&2; exit 3"], None)
            .expect("sh should be available");
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_capture_times_out() {
        let result = run_capture("sleep", &["5"], Some(1));
        assert!(matches!(result, Err(SnapError::Timeout(_))));
    }

    #[test]
    fn test_missing_tool_is_not_installed() {
        assert!(!is_tool_installed("dsnap-definitely-not-a-real-tool"));
    }
}
