use std::fmt;

pub type DeployResult<T> = Result<T, DeployError>;

/// Which side of the deployment an external probe targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The application port, hit directly.
    App,
    /// Nginx on port 80.
    Proxy,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => f.write_str("application"),
            Self::Proxy => f.write_str("proxy"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("cannot reach {target}: {reason}")]
    Connectivity { target: String, reason: String },

    #[error("clone of {repo} failed: {reason}")]
    CloneFailed { repo: String, reason: String },

    #[error("update of {branch} failed: {reason}")]
    PullFailed { branch: String, reason: String },

    #[error("provisioning failed ({step}): {reason}")]
    Provisioning { step: String, reason: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("release failed: {reason}")]
    Release {
        reason: String,
        logs: Option<String>,
    },

    #[error("nginx configuration rejected: {0}")]
    ProxyConfig(String),

    #[error("{endpoint} probe of {url} failed: {reason}")]
    Probe {
        endpoint: Endpoint,
        url: String,
        reason: String,
    },

    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("config file {path}: {reason}")]
    Config { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl DeployError {
    /// Component of the workflow the error belongs to.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::Prompt(_) | Self::Config { .. } => "input",
            Self::Connectivity { .. } => "connectivity",
            Self::CloneFailed { .. } | Self::PullFailed { .. } => "source",
            Self::Provisioning { .. } => "provision",
            Self::Transfer(_) => "transfer",
            Self::Release { .. } => "release",
            Self::ProxyConfig(_) => "proxy",
            Self::Probe { .. } => "validation",
            Self::CommandFailed { .. }
            | Self::CommandNotFound(_)
            | Self::Io(_)
            | Self::Http(_) => "command",
        }
    }

    /// Short reason suitable for nesting into a stage error.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::CommandFailed {
                command, stderr, ..
            } if !stderr.is_empty() => format!("{command}: {stderr}"),
            other => other.to_string(),
        }
    }
}

impl From<dialoguer::Error> for DeployError {
    fn from(e: dialoguer::Error) -> Self {
        Self::Prompt(e.to_string())
    }
}
