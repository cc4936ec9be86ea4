use std::path::Path;

use tracing::debug;

use crate::cmd::{self, CommandOutput, Local, Runner};
use crate::error::{DeployError, DeployResult};

/// Seconds `ssh` waits for the TCP handshake before giving up.
pub const CONNECT_TIMEOUT_SECS: u32 = 10;

/// How a directory tree reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// `rsync --delete`, mirroring the local tree.
    Rsync,
    /// Recursive `scp` into a freshly emptied directory.
    Scp,
}

/// A remote host reachable through discrete shell commands.
///
/// Every call is one blocking session. [`RemoteShell::run`] only
/// fails when the session itself cannot be started; exit codes
/// are returned in [`CommandOutput`].
pub trait RemoteShell {
    /// `user@host` for log lines and errors.
    fn target(&self) -> String;

    /// Authenticate once with a short timeout.
    fn probe(&self) -> DeployResult<()>;

    /// Execute one command on the host.
    fn run(&self, command: &str) -> DeployResult<CommandOutput>;

    /// Write `content` to `remote_path` with elevated rights.
    fn write_file(&self, content: &str, remote_path: &str) -> DeployResult<()>;

    /// Copy the local directory tree into `remote_dir`.
    fn upload_dir(&self, local: &Path, remote_dir: &str, method: TransferMethod)
    -> DeployResult<()>;

    /// Execute a command and fail on a non-zero exit.
    fn exec(&self, command: &str) -> DeployResult<String> {
        self.run(command)?.into_result(command)
    }

    /// Execute a command and report whether it exited zero.
    fn check(&self, command: &str) -> DeployResult<bool> {
        Ok(self.run(command)?.success())
    }
}

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
pub struct SshSession<R = Local> {
    host: String,
    user: String,
    key: String,
    runner: R,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str, key_path: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: key_path.to_string(),
            runner: Local,
        }
    }
}

impl<R: Runner> SshSession<R> {
    /// Run `ssh`, `rsync` and `scp` through another [`Runner`].
    #[must_use]
    pub fn with_runner<T: Runner>(self, runner: T) -> SshSession<T> {
        SshSession {
            host: self.host,
            user: self.user,
            key: self.key,
            runner,
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn ssh(&self, command: &str) -> DeployResult<CommandOutput> {
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.to_string());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(command = %cmd::redact(command), host = %self.destination(), "ssh");
        self.runner.capture("ssh", &refs, None)
    }

    fn ssh_base_args(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-i".to_string(),
            self.key.clone(),
        ]
    }

    fn rsync(&self, local: &Path, remote_dir: &str) -> DeployResult<()> {
        let source = format!("{}/", local.display());
        let dest = format!("{}:{remote_dir}/", self.destination());
        let shell = format!(
            "ssh -i {} -o StrictHostKeyChecking=accept-new \
             -o ConnectTimeout={CONNECT_TIMEOUT_SECS}",
            rsync_quote(&self.key)
        );
        let args: [&str; 8] = [
            "-az", "--delete", "--exclude", ".git", "-e", &shell, &source, &dest,
        ];
        self.local("rsync", &args)
    }

    fn scp(&self, local: &Path, remote_dir: &str) -> DeployResult<()> {
        // scp cannot delete stale files, so start from an empty
        // directory to end up with the same tree rsync would.
        self.exec(&format!("rm -rf {remote_dir}"))?;

        let source = local.display().to_string();
        let dest = format!("{}:{remote_dir}", self.destination());
        let mut args = vec![
            "-r".to_string(),
            "-q".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
            "-i".to_string(),
            self.key.clone(),
        ];
        args.push(source);
        args.push(dest);

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.local("scp", &refs)?;

        // rsync excludes .git; scp copies it along.
        self.exec(&format!("rm -rf {remote_dir}/.git"))?;
        Ok(())
    }

    fn local(&self, program: &str, args: &[&str]) -> DeployResult<()> {
        self.runner
            .capture(program, args, None)?
            .into_result(&cmd::format_command(program, args))?;
        Ok(())
    }
}

/// Quote one argument of the `rsync -e` command. rsync splits
/// that string itself and honours quotes but not backslashes.
fn rsync_quote(arg: &str) -> String {
    if arg.contains('\'') {
        format!("\"{arg}\"")
    } else {
        format!("'{arg}'")
    }
}

impl<R: Runner> RemoteShell for SshSession<R> {
    fn target(&self) -> String {
        self.destination()
    }

    fn probe(&self) -> DeployResult<()> {
        let output = self.ssh("true").map_err(|e| DeployError::Connectivity {
            target: self.destination(),
            reason: e.to_string(),
        })?;

        if output.success() {
            Ok(())
        } else {
            Err(DeployError::Connectivity {
                target: self.destination(),
                reason: if output.stderr.is_empty() {
                    format!("ssh exited with {:?}", output.code)
                } else {
                    output.stderr
                },
            })
        }
    }

    fn run(&self, command: &str) -> DeployResult<CommandOutput> {
        self.ssh(command)
    }

    fn write_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        let command = format!("sudo tee {remote_path} > /dev/null");
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.clone());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin("ssh", &refs, content.as_bytes())?.into_result(&command)?;
        Ok(())
    }

    fn upload_dir(
        &self,
        local: &Path,
        remote_dir: &str,
        method: TransferMethod,
    ) -> DeployResult<()> {
        match method {
            TransferMethod::Rsync => self.rsync(local, remote_dir),
            TransferMethod::Scp => self.scp(local, remote_dir),
        }
    }
}
