// ABOUTME: Local process execution with captured output.
// ABOUTME: Shared by the engine CLI wrapper and the git source fetcher.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Output from a local command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command (`None` if killed by a signal).
    pub exit_code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of a failed command for error messages.
    ///
    /// Prefers the last non-empty stderr line, then stdout, then the exit code.
    pub fn failure_summary(&self) -> String {
        let last_line = |s: &str| {
            s.lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        };
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_else(|| match self.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Run `program args...`, optionally in `cwd`, capturing stdout and stderr.
///
/// A nonzero exit is not an error here; callers inspect [`CommandOutput::success`].
pub async fn run<I, S>(program: &str, args: I, cwd: Option<&Path>) -> std::io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_with_env(program, args, cwd, &[]).await
}

/// Like [`run`], with extra environment variables set for the child.
pub async fn run_with_env<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
    envs: &[(&str, &str)],
) -> std::io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(program, cwd = ?cwd, "spawning command");
    let output = command.output().await?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !result.success() {
        tracing::debug!(program, exit_code = ?result.exit_code, "command failed");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = run("sh", ["-c", "echo hello; exit 0"], None).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let output = run("sh", ["-c", "echo oops >&2; exit 3"], None).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.failure_summary(), "oops");
    }

    #[tokio::test]
    async fn extra_env_reaches_child() {
        let output = run_with_env("sh", ["-c", "echo $OMK_PROBE"], None, &[("OMK_PROBE", "yes")])
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "yes");
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let result = run("omk-definitely-not-a-binary", Vec::<String>::new(), None).await;
        assert!(result.is_err());
    }

    #[test]
    fn summary_falls_back_to_exit_code() {
        let output = CommandOutput {
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "\n".to_string(),
        };
        assert_eq!(output.failure_summary(), "exited with status 2");
    }
}
