//! Ship a web application to a single Debian/Ubuntu host.
//!
//! Dockhand clones (or updates) an application repository,
//! makes sure the target host runs Docker and Nginx, copies the
//! source over SSH, builds and runs it as a container and puts
//! Nginx in front of it on port 80.
//!
//! # Overview
//!
//! A run is a [`Pipeline`] over one validated
//! [`DeploymentRequest`]:
//!
//! 1. **Stage** - clone or pull the repository locally
//!    ([`SourceStager`])
//! 2. **Check** - authenticate once over SSH with a short timeout
//! 3. **Provision** - install and start Docker and Nginx when
//!    missing ([`HostProvisioner`])
//! 4. **Release** - sync the source, swap the container, gate on
//!    its state, rewrite the Nginx site and probe both ends
//!    ([`ReleaseExecutor`])
//! 5. **Teardown** - optional, removes what the release created
//!    ([`Teardown`])
//!
//! Every step is safe to re-run; re-running is also the recovery
//! path after a failure.
//!
//! Remote access goes through the [`RemoteShell`] trait,
//! implemented by [`SshSession`]. Local `git` goes through
//! [`Runner`](cmd::Runner) and HTTP probes through
//! [`HttpProbe`](probe::HttpProbe).
//!
//! # Example
//!
//! ```rust,no_run
//! use dockhand::cmd::Local;
//! use dockhand::probe::ReqwestProbe;
//! use dockhand::request::{RequestInput, Secret};
//! use dockhand::{DeploymentRequest, Pipeline, SshSession};
//!
//! fn main() -> anyhow::Result<()> {
//!     let request = DeploymentRequest::validate(RequestInput {
//!         repo_url: "https://example.com/org/app.git".into(),
//!         token: Some(Secret::new("ghp_example")),
//!         branch: "main".into(),
//!         ssh_user: "ubuntu".into(),
//!         ssh_host: "203.0.113.5".into(),
//!         ssh_key: "~/.ssh/id.pem".into(),
//!         app_port: "5000".into(),
//!         ..RequestInput::default()
//!     })?;
//!
//!     let key = request.ssh_key().display().to_string();
//!     let ssh = SshSession::new(request.ssh_host(), request.ssh_user(), &key);
//!     let probe = ReqwestProbe::new()?;
//!
//!     Pipeline::new(&request, &Local, &ssh, &probe).run()?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod probe;
pub mod prompt;
pub mod provision;
pub mod release;
pub mod request;
pub mod source;
pub mod ssh;
pub mod teardown;

pub use error::{DeployError, DeployResult};
pub use nginx::NginxSite;
pub use pipeline::Pipeline;
pub use provision::{HostProvisioner, RemoteHostState};
pub use release::ReleaseExecutor;
pub use request::DeploymentRequest;
pub use source::SourceStager;
pub use ssh::{RemoteShell, SshSession};
pub use teardown::Teardown;
