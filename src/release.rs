use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::cmd;
use crate::error::{DeployError, DeployResult, Endpoint};
use crate::nginx::{NginxSite, SITES_AVAILABLE, SITES_ENABLED};
use crate::probe::HttpProbe;
use crate::provision::container_exists;
use crate::request::DeploymentRequest;
use crate::source::ReleaseArtifact;
use crate::ssh::{RemoteShell, TransferMethod};

/// Default wait between starting the container and inspecting it.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(10);

/// Lines of container output surfaced when the health gate fails.
const LOG_TAIL: u32 = 50;

/// Subset of `docker inspect --format '{{json .State}}'`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    pub status: String,
    pub running: bool,
    #[serde(default)]
    pub restarting: bool,
    #[serde(default)]
    pub exit_code: i64,
}

impl ContainerState {
    /// Up and not cycling through restarts. Docker reports a
    /// crash-looping container as `Running` too.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.running && !self.restarting && self.status == "running"
    }
}

/// Summary of a successful release.
#[derive(Debug, Clone)]
pub struct Release {
    pub transfer: TransferMethod,
    pub image: String,
    pub container: String,
    pub state: ContainerState,
}

/// Makes a staged artifact live behind nginx on port 80.
pub struct ReleaseExecutor<'a> {
    remote: &'a dyn RemoteShell,
    probe: &'a dyn HttpProbe,
    settle: Duration,
}

impl<'a> ReleaseExecutor<'a> {
    #[must_use]
    pub const fn new(remote: &'a dyn RemoteShell, probe: &'a dyn HttpProbe) -> Self {
        Self {
            remote,
            probe,
            settle: DEFAULT_SETTLE,
        }
    }

    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Transfer, swap the container, gate on its state, point
    /// nginx at it and probe both ends. Stops at the first failure.
    pub fn release(
        &self,
        request: &DeploymentRequest,
        artifact: &ReleaseArtifact,
    ) -> DeployResult<Release> {
        let transfer = self.transfer(request, artifact)?;
        let image = self.swap_container(request)?;
        let state = self.health_gate(request)?;
        self.configure_proxy(request)?;
        self.validate(request)?;

        Ok(Release {
            transfer,
            image,
            container: request.app_name().to_string(),
            state,
        })
    }

    /// Mirror the working copy into the remote deployment
    /// directory, preferring rsync.
    pub fn transfer(
        &self,
        request: &DeploymentRequest,
        artifact: &ReleaseArtifact,
    ) -> DeployResult<TransferMethod> {
        let remote_dir = request.remote_dir();
        let rsync_remote = self
            .remote
            .check("command -v rsync")
            .map_err(|e| DeployError::Transfer(e.detail()))?;
        let method = if cmd::command_exists("rsync") && rsync_remote {
            TransferMethod::Rsync
        } else {
            warn!("rsync unavailable, falling back to scp");
            TransferMethod::Scp
        };

        info!(
            from = %artifact.path.display(),
            to = %format!("{}:{remote_dir}", self.remote.target()),
            ?method,
            "transferring source"
        );

        self.remote
            .exec(&format!("mkdir -p {remote_dir}"))
            .and_then(|_| self.remote.upload_dir(&artifact.path, remote_dir, method))
            .map_err(|e| DeployError::Transfer(e.detail()))?;

        Ok(method)
    }

    /// Build the new image, drop the old container, start the new
    /// one. The old container keeps serving while the image builds.
    pub fn swap_container(&self, request: &DeploymentRequest) -> DeployResult<String> {
        let name = request.app_name();
        let port = request.app_port();
        let image = format!("{name}:latest");

        info!(%image, "building image");
        self.release_step(
            "image build",
            &format!("cd {} && sudo docker build -t {image} .", request.remote_dir()),
        )?;

        if container_exists(self.remote, name).map_err(release_error("container lookup"))? {
            info!(container = name, "removing previous container");
            self.release_step("remove container", &format!("sudo docker rm -f {name}"))?;
        }

        info!(container = name, port, "starting container");
        self.release_step(
            "container start",
            &format!(
                "sudo docker run -d --name {name} --restart unless-stopped \
                 -p {port}:{port} -e PORT={port} {image}"
            ),
        )?;

        Ok(image)
    }

    /// Wait out the settle delay, then require the container to
    /// be running and not restarting. Otherwise fail with its
    /// recent logs.
    pub fn health_gate(&self, request: &DeploymentRequest) -> DeployResult<ContainerState> {
        let name = request.app_name();
        info!(seconds = self.settle.as_secs(), "waiting for container to settle");
        thread::sleep(self.settle);

        let raw = self
            .remote
            .exec(&format!("sudo docker inspect --format '{{{{json .State}}}}' {name}"))
            .map_err(release_error("container inspect"))?;
        let state: ContainerState =
            serde_json::from_str(raw.trim()).map_err(|e| DeployError::Release {
                reason: format!("unreadable container state: {e}"),
                logs: None,
            })?;

        if state.is_healthy() {
            info!(container = name, status = %state.status, "container running");
            return Ok(state);
        }

        let logs = self
            .remote
            .run(&format!("sudo docker logs --tail {LOG_TAIL} {name} 2>&1"))
            .map(|o| o.stdout)
            .ok();
        error!(
            container = name,
            status = %state.status,
            exit_code = state.exit_code,
            logs = logs.as_deref().unwrap_or_default(),
            "container is not running"
        );
        Err(DeployError::Release {
            reason: format!(
                "container {name} is {} (exit code {})",
                state.status, state.exit_code
            ),
            logs,
        })
    }

    /// Replace the site definition and reload nginx only if the
    /// full configuration passes `nginx -t`. A rejected
    /// configuration is rolled back before returning.
    pub fn configure_proxy(&self, request: &DeploymentRequest) -> DeployResult<()> {
        let site = NginxSite::new(request.app_name(), request.app_port());
        let path = site.available_path();
        let enabled = site.enabled_path();
        let staged = format!("{path}.new");
        let backup = format!("{path}.bak");
        let default_enabled = format!("{SITES_ENABLED}/default");

        info!(site = %path, upstream_port = site.upstream_port, "writing nginx site");

        self.remote
            .write_file(&site.render(), &staged)
            .map_err(|e| DeployError::ProxyConfig(e.detail()))?;

        let had_site = self.proxy_check(&format!("sudo test -f {path}"))?;
        let had_default = self.proxy_check(&format!("sudo test -e {default_enabled}"))?;

        if had_site {
            self.proxy_step(&format!("sudo cp -a {path} {backup}"))?;
        }
        self.proxy_step(&format!("sudo mv {staged} {path}"))?;
        self.proxy_step(&format!("sudo ln -sf {path} {enabled}"))?;
        self.proxy_step(&format!("sudo rm -f {default_enabled}"))?;

        let check = self
            .remote
            .run("sudo nginx -t")
            .map_err(|e| DeployError::ProxyConfig(e.detail()))?;
        if !check.success() {
            error!(stderr = %check.stderr, "nginx rejected the configuration, restoring");
            if had_site {
                self.proxy_step(&format!("sudo mv {backup} {path}"))?;
            } else {
                self.proxy_step(&format!("sudo rm -f {enabled} {path}"))?;
            }
            if had_default {
                self.proxy_step(&format!(
                    "sudo ln -sf {SITES_AVAILABLE}/default {default_enabled}"
                ))?;
            }
            return Err(DeployError::ProxyConfig(check.stderr));
        }

        self.proxy_step("sudo systemctl reload nginx")?;
        if had_site {
            self.proxy_step(&format!("sudo rm -f {backup}"))?;
        }
        info!("nginx reloaded");
        Ok(())
    }

    /// Probe the application port directly, then nginx on port 80.
    pub fn validate(&self, request: &DeploymentRequest) -> DeployResult<()> {
        let host = request.ssh_host();
        self.expect_ok(Endpoint::App, &format!("http://{host}:{}/", request.app_port()))?;
        self.expect_ok(Endpoint::Proxy, &format!("http://{host}/"))?;
        Ok(())
    }

    fn expect_ok(&self, endpoint: Endpoint, url: &str) -> DeployResult<()> {
        let fail = |reason: String| DeployError::Probe {
            endpoint,
            url: url.to_string(),
            reason,
        };

        let status = self.probe.get(url).map_err(|e| fail(e.to_string()))?;
        if (200..300).contains(&status) {
            info!(%endpoint, url, status, "probe succeeded");
            Ok(())
        } else {
            Err(fail(format!("HTTP {status}")))
        }
    }

    fn release_step(&self, what: &'static str, command: &str) -> DeployResult<()> {
        self.remote
            .exec(command)
            .map(|_| ())
            .map_err(release_error(what))
    }

    fn proxy_step(&self, command: &str) -> DeployResult<()> {
        self.remote
            .exec(command)
            .map(|_| ())
            .map_err(|e| DeployError::ProxyConfig(e.detail()))
    }

    fn proxy_check(&self, command: &str) -> DeployResult<bool> {
        self.remote
            .check(command)
            .map_err(|e| DeployError::ProxyConfig(e.detail()))
    }
}

fn release_error(what: &'static str) -> impl Fn(DeployError) -> DeployError {
    move |e| DeployError::Release {
        reason: format!("{what}: {}", e.detail()),
        logs: None,
    }
}
