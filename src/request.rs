//! Deployment parameters: raw operator input and the validated,
//! immutable request every component receives.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_APP_NAME: &str = "webapp";

/// A credential that never shows up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    /// The cleartext value, for building authenticated
    /// invocations only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Unvalidated answers gathered from prompts, a deployment file,
/// or the environment.
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub repo_url: String,
    pub token: Option<Secret>,
    pub branch: String,
    pub ssh_user: String,
    pub ssh_host: String,
    pub ssh_key: String,
    pub app_port: String,
    pub app_name: Option<String>,
    pub remote_dir: Option<String>,
    pub work_dir: Option<PathBuf>,
}

/// Validated deployment parameters. Only [`DeploymentRequest::validate`]
/// builds one, and nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    repo_url: String,
    token: Secret,
    branch: String,
    ssh_user: String,
    ssh_host: String,
    ssh_key: PathBuf,
    app_port: u16,
    app_name: String,
    remote_dir: String,
    work_dir: PathBuf,
}

impl DeploymentRequest {
    /// Check every rule at once. All violations are reported
    /// together in a single [`DeployError::InvalidInput`].
    pub fn validate(input: RequestInput) -> DeployResult<Self> {
        let mut problems = Vec::new();

        let repo_url = input.repo_url.trim().to_string();
        if repo_url.is_empty() {
            problems.push("repository URL is empty".to_string());
        }

        let token = match input.token {
            Some(t) if !t.is_empty() => t,
            _ => {
                problems.push("access token is empty".to_string());
                Secret::new("")
            }
        };

        let branch = match input.branch.trim() {
            "" => DEFAULT_BRANCH.to_string(),
            b => b.to_string(),
        };

        let ssh_user = input.ssh_user.trim().to_string();
        if ssh_user.is_empty() {
            problems.push("SSH username is empty".to_string());
        }

        let ssh_host = input.ssh_host.trim().to_string();
        if ssh_host.is_empty() {
            problems.push("SSH host is empty".to_string());
        }

        let ssh_key = expand_tilde(input.ssh_key.trim());
        if input.ssh_key.trim().is_empty() {
            problems.push("SSH key path is empty".to_string());
        } else if !ssh_key.is_file() {
            problems.push(format!("SSH key {} does not exist", ssh_key.display()));
        }

        let app_port = match parse_port(&input.app_port) {
            Ok(port) => port,
            Err(reason) => {
                problems.push(reason);
                0
            }
        };

        let app_name = input
            .app_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        if !app_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            problems.push(format!(
                "application name '{app_name}' may only contain letters, digits, '-' and '_'"
            ));
        }

        let remote_dir = match input.remote_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => {
                // Interpolated unquoted so a leading `~` still expands remotely.
                if !dir
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '~' | '.' | '-' | '_'))
                {
                    problems.push(format!(
                        "remote directory '{dir}' may only contain letters, digits \
                         and '/', '~', '.', '-', '_'"
                    ));
                }
                dir.to_string()
            }
            _ => format!("~/{app_name}"),
        };

        let work_dir = input
            .work_dir
            .unwrap_or_else(|| PathBuf::from(repo_dir_name(&repo_url)));

        if !problems.is_empty() {
            return Err(DeployError::InvalidInput(problems));
        }

        Ok(Self {
            repo_url,
            token,
            branch,
            ssh_user,
            ssh_host,
            ssh_key,
            app_port,
            app_name,
            remote_dir,
            work_dir,
        })
    }

    #[must_use]
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    #[must_use]
    pub const fn token(&self) -> &Secret {
        &self.token
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    #[must_use]
    pub fn ssh_user(&self) -> &str {
        &self.ssh_user
    }

    #[must_use]
    pub fn ssh_host(&self) -> &str {
        &self.ssh_host
    }

    #[must_use]
    pub fn ssh_key(&self) -> &Path {
        &self.ssh_key
    }

    #[must_use]
    pub const fn app_port(&self) -> u16 {
        self.app_port
    }

    /// Container, image and nginx site name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    /// Local working copy of the repository.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Replace a leading `~` with the home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("application port is empty".to_string());
    }
    match raw.parse::<u16>() {
        Ok(0) => Err("application port must be positive".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("application port '{raw}' is not a valid port number")),
    }
}

/// Last path segment of the repository URL without `.git`.
fn repo_dir_name(repo_url: &str) -> String {
    let name = repo_url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim_end_matches(".git");
    if name.is_empty() {
        "app-source".to_string()
    } else {
        name.to_string()
    }
}
