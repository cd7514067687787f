//! Shell command execution for the command-line device client.
//!
//! The production client drives the device through `gnoic`, `gnmic` and
//! `ssh`. Arguments such as gNMI paths (`component[name=FPC0]`) and console
//! commands with embedded quotes must survive `/bin/sh -c`, so everything
//! user-provided goes through [`shellquote`].
//!
//! # Example
//!
//! ```ignore
//! use sonic_reboot_common::shell::{self, GNMIC_CMD, shellquote};
//!
//! let path = "/components/component[name=FPC0]/state/removable";
//! let cmd = format!("{} get --path {}", GNMIC_CMD, shellquote(path));
//! let result = shell::exec(&cmd).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{DeviceError, DeviceResult};

/// gNOI command-line client.
pub const GNOIC_CMD: &str = "gnoic";

/// gNMI command-line client.
pub const GNMIC_CMD: &str = "gnmic";

/// Path to `ssh` for console commands.
pub const SSH_CMD: &str = "/usr/bin/ssh";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use inside a `/bin/sh -c` command line.
///
/// # Example
///
/// ```
/// use sonic_reboot_common::shell::shellquote;
///
/// assert_eq!(shellquote("FPC0"), "\"FPC0\"");
/// assert_eq!(shellquote("say \"hi\""), "\"say \\\"hi\\\"\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a command through `/bin/sh -c`.
///
/// A non-zero exit is not an error here; callers that need to classify the
/// device's complaint inspect [`ExecResult`] themselves.
pub async fn exec(cmd: &str) -> DeviceResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DeviceError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    // stdout is kept verbatim: console tables are whitespace sensitive.
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::debug!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a command and returns its stdout, failing on non-zero exit.
pub async fn exec_checked(cmd: &str) -> DeviceResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(DeviceError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellquote_gnmi_path() {
        // Brackets and '=' are literal inside double quotes.
        assert_eq!(
            shellquote("/components/component[name=FPC0]/state/empty"),
            "\"/components/component[name=FPC0]/state/empty\""
        );
    }

    #[test]
    fn test_shellquote_console_command() {
        let cmd = r#"request pfe execute target fpc0 command "show cda trapstats" | no-more"#;
        let expected =
            r#""request pfe execute target fpc0 command \"show cda trapstats\" | no-more""#;
        assert_eq!(shellquote(cmd), expected);
    }

    #[test]
    fn test_shellquote_expansion_chars() {
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`id`"), "\"\\`id\\`\"");
        assert_eq!(shellquote("a\\b"), "\"a\\\\b\"");
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_exec_result_combined() {
        let result = ExecResult {
            exit_code: 1,
            stdout: "partial".to_string(),
            stderr: "rpc error: code = Unavailable".to_string(),
        };
        assert!(!result.success());
        assert_eq!(
            result.combined_output(),
            "partial\nrpc error: code = Unavailable"
        );
    }

    #[tokio::test]
    async fn test_exec_keeps_stdout_layout() {
        let result = exec("printf '  0  12  arp  1  0\\n'").await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "  0  12  arp  1  0\n");
    }

    #[tokio::test]
    async fn test_exec_checked_failure() {
        match exec_checked("echo boom >&2; exit 3").await {
            Err(DeviceError::ShellCommandFailed {
                exit_code, output, ..
            }) => {
                assert_eq!(exit_code, 3);
                assert_eq!(output, "boom");
            }
            other => panic!("Expected ShellCommandFailed error, got {:?}", other),
        }
    }
}
