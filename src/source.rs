use std::path::{Path, PathBuf};

use tracing::{info, warn};
use url::Url;

use crate::cmd::{CommandOutput, Runner, format_command};
use crate::error::{DeployError, DeployResult};
use crate::request::{DeploymentRequest, Secret};

/// What happened to the working copy.
#[derive(Debug)]
pub enum StageOutcome {
    /// Fresh clone of the requested branch.
    Cloned,
    /// Existing copy switched to the branch and fast-forwarded.
    Updated,
    /// Existing copy kept as-is because the pull failed.
    Stale(DeployError),
}

/// The staged source tree handed to the release step.
#[derive(Debug)]
pub struct ReleaseArtifact {
    pub repo_url: String,
    pub branch: String,
    pub path: PathBuf,
    pub outcome: StageOutcome,
}

/// Obtains or refreshes the local working copy with `git`.
pub struct SourceStager<'a> {
    runner: &'a dyn Runner,
}

impl<'a> SourceStager<'a> {
    #[must_use]
    pub const fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }

    /// Clone when the working copy is missing, otherwise switch
    /// branch and pull. A failed pull is logged and the existing
    /// tree is used.
    pub fn stage(&self, request: &DeploymentRequest) -> DeployResult<ReleaseArtifact> {
        let dir = request.work_dir();
        let auth_url = authenticated_url(request.repo_url(), request.token());

        let outcome = if dir.exists() {
            info!(dir = %dir.display(), branch = request.branch(), "updating working copy");
            self.switch_branch(dir, request.branch(), request.token())?;
            match self.pull(dir, &auth_url, request.branch(), request.token()) {
                Ok(()) => StageOutcome::Updated,
                Err(e) => {
                    warn!(error = %e, "pull failed, deploying the existing working copy");
                    StageOutcome::Stale(e)
                }
            }
        } else {
            info!(dir = %dir.display(), branch = request.branch(), "cloning repository");
            self.clone_fresh(request, &auth_url, dir)?;
            StageOutcome::Cloned
        };

        Ok(ReleaseArtifact {
            repo_url: request.repo_url().to_string(),
            branch: request.branch().to_string(),
            path: dir.to_path_buf(),
            outcome,
        })
    }

    fn clone_fresh(
        &self,
        request: &DeploymentRequest,
        auth_url: &str,
        dir: &Path,
    ) -> DeployResult<()> {
        let target = dir.display().to_string();
        let output = self.git(
            None,
            &["clone", "--branch", request.branch(), auth_url, &target],
        )?;
        if !output.success() {
            return Err(DeployError::CloneFailed {
                repo: request.repo_url().to_string(),
                reason: scrub(&output.stderr, request.token()),
            });
        }

        // Keep the token out of .git/config.
        let reset = self.git(
            Some(dir),
            &["remote", "set-url", "origin", request.repo_url()],
        )?;
        if !reset.success() {
            warn!(stderr = %scrub(&reset.stderr, request.token()), "could not reset origin URL");
        }
        Ok(())
    }

    fn switch_branch(&self, dir: &Path, branch: &str, token: &Secret) -> DeployResult<()> {
        if self.git(Some(dir), &["checkout", branch])?.success() {
            return Ok(());
        }
        let created = self.git(Some(dir), &["checkout", "-b", branch])?;
        if created.success() {
            Ok(())
        } else {
            Err(DeployError::CommandFailed {
                command: format_command("git", &["checkout", "-b", branch]),
                code: created.code,
                stderr: scrub(&created.stderr, token),
            })
        }
    }

    fn pull(&self, dir: &Path, auth_url: &str, branch: &str, token: &Secret) -> DeployResult<()> {
        let output = self.git(Some(dir), &["pull", "--ff-only", auth_url, branch])?;
        if output.success() {
            Ok(())
        } else {
            Err(DeployError::PullFailed {
                branch: branch.to_string(),
                reason: scrub(&output.stderr, token),
            })
        }
    }

    fn git(&self, cwd: Option<&Path>, args: &[&str]) -> DeployResult<CommandOutput> {
        self.runner.capture("git", args, cwd)
    }
}

/// Embed the token as the userinfo of an HTTP(S) repository URL.
/// Other URL forms are returned unchanged.
#[must_use]
pub fn authenticated_url(repo_url: &str, token: &Secret) -> String {
    match Url::parse(repo_url) {
        Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
            if url.set_username(token.expose()).is_err() {
                return repo_url.to_string();
            }
            url.to_string()
        }
        _ => repo_url.to_string(),
    }
}

fn scrub(text: &str, token: &Secret) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token.expose(), "***")
    }
}
