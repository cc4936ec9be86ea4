use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::RemoteShell;

/// Vendor convenience script for installing Docker Engine.
pub const DOCKER_INSTALL_URL: &str = "https://get.docker.com";

/// Observed facts about the target host.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteHostState {
    pub docker_installed: bool,
    pub docker_running: bool,
    pub nginx_installed: bool,
    pub nginx_running: bool,
    pub container_present: bool,
}

impl RemoteHostState {
    /// Query the host. `container` is the release container name.
    pub fn observe(remote: &dyn RemoteShell, container: &str) -> DeployResult<Self> {
        let docker_installed = remote.check("command -v docker")?;
        let nginx_installed = remote.check("command -v nginx")?;
        let docker_running =
            docker_installed && remote.check("systemctl is-active --quiet docker")?;
        let nginx_running =
            nginx_installed && remote.check("systemctl is-active --quiet nginx")?;
        let container_present = docker_running && container_exists(remote, container)?;

        Ok(Self {
            docker_installed,
            docker_running,
            nginx_installed,
            nginx_running,
            container_present,
        })
    }

    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.docker_installed && self.docker_running && self.nginx_installed && self.nginx_running
    }
}

/// Whether a container (running or not) carries `name`.
pub fn container_exists(remote: &dyn RemoteShell, name: &str) -> DeployResult<bool> {
    let names = remote.exec(&format!(
        "sudo docker ps -a --filter name=^/{name}$ --format '{{{{.Names}}}}'"
    ))?;
    Ok(names.lines().any(|line| line.trim() == name))
}

/// Installs and starts Docker and Nginx on a Debian/Ubuntu host.
///
/// Each step checks before acting, so running it against a host
/// that is already set up installs nothing.
pub struct HostProvisioner<'a> {
    remote: &'a dyn RemoteShell,
    user: &'a str,
}

impl<'a> HostProvisioner<'a> {
    #[must_use]
    pub const fn new(remote: &'a dyn RemoteShell, user: &'a str) -> Self {
        Self { remote, user }
    }

    pub fn provision(&self, container: &str) -> DeployResult<RemoteHostState> {
        let before = RemoteHostState::observe(self.remote, container)?;
        info!(host = %self.remote.target(), ?before, "provisioning host");

        self.step("refresh package index", "sudo apt-get update -y")?;

        if before.docker_installed {
            info!("docker already installed");
        } else {
            info!("installing docker");
            self.step(
                "install docker",
                &format!("curl -fsSL {DOCKER_INSTALL_URL} | sudo sh"),
            )?;
            // Takes effect on the next login; release commands use sudo.
            self.step(
                "add user to docker group",
                &format!("sudo usermod -aG docker {}", self.user),
            )?;
        }

        if before.nginx_installed {
            info!("nginx already installed");
        } else {
            info!("installing nginx");
            self.step(
                "install nginx",
                "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y nginx",
            )?;
        }

        self.step("start docker", "sudo systemctl enable --now docker")?;
        self.step("start nginx", "sudo systemctl enable --now nginx")?;

        let after = RemoteHostState::observe(self.remote, container)?;
        if !after.is_provisioned() {
            return Err(DeployError::Provisioning {
                step: "verify services".into(),
                reason: format!("host state after provisioning: {after:?}"),
            });
        }

        info!(?after, "host provisioned");
        Ok(after)
    }

    fn step(&self, step: &str, command: &str) -> DeployResult<()> {
        self.remote
            .exec(command)
            .map(|_| ())
            .map_err(|e| DeployError::Provisioning {
                step: step.to_string(),
                reason: e.detail(),
            })
    }
}
