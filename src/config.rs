use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DeployError, DeployResult};
use crate::request::RequestInput;

/// Optional YAML file pre-filling the non-secret answers.
///
/// ```yaml
/// repo_url: https://example.com/org/app.git
/// branch: main
/// ssh_user: ubuntu
/// ssh_host: 203.0.113.5
/// ssh_key: ~/.ssh/id.pem
/// app_port: 5000
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployFile {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_host: Option<String>,
    pub ssh_key: Option<String>,
    pub app_port: Option<u16>,
    pub app_name: Option<String>,
    pub remote_dir: Option<String>,
    pub work_dir: Option<PathBuf>,
}

impl DeployFile {
    pub fn load(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| DeployError::Config {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Seed a [`RequestInput`] with whatever the file provides.
    #[must_use]
    pub fn into_input(self) -> RequestInput {
        RequestInput {
            repo_url: self.repo_url.unwrap_or_default(),
            token: None,
            branch: self.branch.unwrap_or_default(),
            ssh_user: self.ssh_user.unwrap_or_default(),
            ssh_host: self.ssh_host.unwrap_or_default(),
            ssh_key: self.ssh_key.unwrap_or_default(),
            app_port: self.app_port.map(|p| p.to_string()).unwrap_or_default(),
            app_name: self.app_name,
            remote_dir: self.remote_dir,
            work_dir: self.work_dir,
        }
    }
}
