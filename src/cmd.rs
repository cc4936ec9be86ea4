use std::path::Path;
use std::process::{Command, Output, Stdio};

use url::Url;

use crate::error::{DeployError, DeployResult};

/// Exit code and captured streams of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Turn a non-zero exit into [`DeployError::CommandFailed`].
    pub fn into_result(self, command: &str) -> DeployResult<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(DeployError::CommandFailed {
                command: redact(command),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Runs local programs. The source stager goes through this so
/// tests can substitute git.
pub trait Runner {
    /// Run `program` to completion, optionally inside `cwd`.
    /// Only spawn failures are errors; a non-zero exit is
    /// reported through [`CommandOutput::code`].
    fn capture(&self, program: &str, args: &[&str], cwd: Option<&Path>)
    -> DeployResult<CommandOutput>;
}

/// [`Runner`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Local;

impl Runner for Local {
    fn capture(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> DeployResult<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        spawn(program, &mut command).map(CommandOutput::from)
    }
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(
    program: &str,
    args: &[&str],
    stdin_data: &[u8],
) -> DeployResult<CommandOutput> {
    use std::io::Write;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    Ok(child.wait_with_output()?.into())
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Join a command line for logs and errors, masking any
/// credentials embedded in URL arguments.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| redact(a)));
    parts.join(" ")
}

/// Mask the userinfo of every URL found in `text`.
#[must_use]
pub fn redact(text: &str) -> String {
    text.split(' ')
        .map(|word| match Url::parse(word) {
            Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
                let _ = url.set_password(None);
                let _ = url.set_username("***");
                url.to_string()
            }
            _ => word.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn(program: &str, command: &mut Command) -> DeployResult<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn not_found_or_io(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}
