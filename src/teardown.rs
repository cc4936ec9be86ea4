use tracing::info;

use crate::error::DeployResult;
use crate::nginx::{NginxSite, SITES_AVAILABLE, SITES_ENABLED};
use crate::provision::container_exists;
use crate::request::DeploymentRequest;
use crate::ssh::RemoteShell;

/// Removes what a release created on the host: the container,
/// its image, the nginx site and the deployment directory.
///
/// Anything already gone counts as removed. Docker, nginx and
/// the local working copy are left alone.
pub struct Teardown<'a> {
    remote: &'a dyn RemoteShell,
}

impl<'a> Teardown<'a> {
    #[must_use]
    pub const fn new(remote: &'a dyn RemoteShell) -> Self {
        Self { remote }
    }

    pub fn run(&self, request: &DeploymentRequest) -> DeployResult<()> {
        let name = request.app_name();
        info!(host = %self.remote.target(), app = name, "tearing down");

        // A stopped daemon cannot answer `docker ps`; nothing of
        // ours is running then.
        let docker = self.remote.check("systemctl is-active --quiet docker")?;
        if docker {
            if container_exists(self.remote, name)? {
                self.remote.exec(&format!("sudo docker rm -f {name}"))?;
                info!(container = name, "container removed");
            }
            let image = format!("{name}:latest");
            if self
                .remote
                .check(&format!("sudo docker image inspect {image} > /dev/null 2>&1"))?
            {
                self.remote.exec(&format!("sudo docker rmi -f {image}"))?;
                info!(%image, "image removed");
            }
        }

        let site = NginxSite::new(name, request.app_port());
        self.remote.exec(&format!(
            "sudo rm -f {} {}",
            site.enabled_path(),
            site.available_path()
        ))?;

        let default_site = format!("{SITES_AVAILABLE}/default");
        if self.remote.check(&format!("test -f {default_site}"))? {
            self.remote
                .exec(&format!("sudo ln -sf {default_site} {SITES_ENABLED}/default"))?;
        }

        if self.remote.check("systemctl is-active --quiet nginx")? {
            self.remote.exec("sudo systemctl reload nginx")?;
        }

        self.remote.exec(&format!("rm -rf {}", request.remote_dir()))?;

        info!("teardown complete");
        Ok(())
    }
}
