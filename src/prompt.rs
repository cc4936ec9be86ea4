//! Interactive collection of the deployment parameters.

use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::error::DeployResult;
use crate::request::{DEFAULT_BRANCH, RequestInput, Secret};

/// Environment variable consulted for the access token before
/// prompting.
pub const TOKEN_ENV: &str = "DEPLOY_TOKEN";

/// Prompt for every field `input` does not already carry, in
/// the order: repository, token, branch, user, host, key, port.
pub fn collect(mut input: RequestInput) -> DeployResult<RequestInput> {
    let theme = ColorfulTheme::default();

    if input.repo_url.trim().is_empty() {
        input.repo_url = ask(&theme, "Git repository URL")?;
    }

    if input.token.is_none() {
        input.token = match std::env::var(TOKEN_ENV) {
            Ok(value) if !value.trim().is_empty() => Some(Secret::new(value.trim())),
            _ => {
                let value = Password::with_theme(&theme)
                    .with_prompt("Personal access token")
                    .allow_empty_password(true)
                    .interact()?;
                Some(Secret::new(value.trim()))
            }
        };
    }

    if input.branch.trim().is_empty() {
        input.branch = Input::with_theme(&theme)
            .with_prompt("Branch")
            .default(DEFAULT_BRANCH.to_string())
            .interact_text()?;
    }

    if input.ssh_user.trim().is_empty() {
        input.ssh_user = ask(&theme, "Remote server username")?;
    }

    if input.ssh_host.trim().is_empty() {
        input.ssh_host = ask(&theme, "Remote server IP address")?;
    }

    if input.ssh_key.trim().is_empty() {
        input.ssh_key = ask(&theme, "SSH private key path")?;
    }

    if input.app_port.trim().is_empty() {
        input.app_port = ask(&theme, "Application port")?;
    }

    Ok(input)
}

/// Empty answers are accepted here and rejected by validation so
/// that every problem is reported in one place.
fn ask(theme: &ColorfulTheme, prompt: &str) -> DeployResult<String> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}
