use std::time::Duration;

use tracing::info;

use crate::cmd::Runner;
use crate::error::DeployResult;
use crate::nginx::NginxSite;
use crate::probe::HttpProbe;
use crate::provision::{HostProvisioner, RemoteHostState};
use crate::release::{DEFAULT_SETTLE, Release, ReleaseExecutor};
use crate::request::DeploymentRequest;
use crate::source::{ReleaseArtifact, SourceStager};
use crate::ssh::RemoteShell;
use crate::teardown::Teardown;

/// What a completed run did.
#[derive(Debug)]
pub struct Report {
    pub artifact: ReleaseArtifact,
    pub host: RemoteHostState,
    pub release: Release,
    pub torn_down: bool,
}

/// Deployment pipeline: stage the source, check the host is
/// reachable, provision it, release, and optionally tear down.
///
/// Each phase runs to completion before the next starts and the
/// first error ends the run.
pub struct Pipeline<'a> {
    request: &'a DeploymentRequest,
    runner: &'a dyn Runner,
    remote: &'a dyn RemoteShell,
    probe: &'a dyn HttpProbe,
    settle: Duration,
    cleanup: bool,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(
        request: &'a DeploymentRequest,
        runner: &'a dyn Runner,
        remote: &'a dyn RemoteShell,
        probe: &'a dyn HttpProbe,
    ) -> Self {
        Self {
            request,
            runner,
            remote,
            probe,
            settle: DEFAULT_SETTLE,
            cleanup: false,
        }
    }

    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Run [`Teardown`] after a successful release.
    #[must_use]
    pub const fn cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn run(&self) -> DeployResult<Report> {
        let request = self.request;

        let artifact = SourceStager::new(self.runner).stage(request)?;

        info!(host = %self.remote.target(), "checking connectivity");
        self.remote.probe()?;

        let host = HostProvisioner::new(self.remote, request.ssh_user())
            .provision(request.app_name())?;

        let release = ReleaseExecutor::new(self.remote, self.probe)
            .settle(self.settle)
            .release(request, &artifact)?;

        info!(
            app = request.app_name(),
            url = %format!("http://{}/", request.ssh_host()),
            "deployment complete"
        );

        if self.cleanup {
            Teardown::new(self.remote).run(request)?;
        }

        Ok(Report {
            artifact,
            host,
            release,
            torn_down: self.cleanup,
        })
    }
}

/// Steps a run would perform, for `--dry-run`.
#[must_use]
pub fn plan(request: &DeploymentRequest, cleanup: bool) -> Vec<String> {
    let target = format!("{}@{}", request.ssh_user(), request.ssh_host());
    let site = NginxSite::new(request.app_name(), request.app_port());
    let mut steps = vec![
        format!(
            "Stage {} ({}) into {}",
            request.repo_url(),
            request.branch(),
            request.work_dir().display()
        ),
        format!("Check SSH access to {target}"),
        "Install and start Docker and Nginx if missing".to_string(),
        format!("Sync source to {target}:{}", request.remote_dir()),
        format!(
            "Build {0}:latest and run container {0} on port {1}",
            request.app_name(),
            request.app_port()
        ),
        format!("Write {} and reload nginx", site.available_path()),
        format!(
            "Probe http://{0}:{1}/ and http://{0}/",
            request.ssh_host(),
            request.app_port()
        ),
    ];
    if cleanup {
        steps.push(format!("Tear down {} on {target}", request.app_name()));
    }
    steps
}
