use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use dockhand::cmd::Local;
use dockhand::config::DeployFile;
use dockhand::error::DeployError;
use dockhand::logging;
use dockhand::nginx::NginxSite;
use dockhand::pipeline::{self, Pipeline};
use dockhand::probe::ReqwestProbe;
use dockhand::prompt;
use dockhand::request::{DeploymentRequest, RequestInput};
use dockhand::ssh::SshSession;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Provision a host with Docker and Nginx and deploy an app to it")]
struct Cli {
    /// Tear the deployment down again after it succeeds
    #[arg(long)]
    cleanup: bool,

    /// YAML file with answers that should not be prompted for
    #[arg(long, env = "DOCKHAND_CONFIG")]
    config: Option<PathBuf>,

    /// Validate input and print the planned actions only
    #[arg(long)]
    dry_run: bool,

    /// Directory for the daily log file
    #[arg(long, default_value = logging::DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Seconds to wait before checking the container state
    #[arg(long, default_value_t = 10)]
    settle_secs: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_path = match logging::init(&cli.log_dir) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("cannot open log file in {}: {e}", cli.log_dir.display());
            return ExitCode::FAILURE;
        }
    };
    info!(log = %log_path.display(), "dockhand starting");

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let stage = err
                .downcast_ref::<DeployError>()
                .map_or("setup", DeployError::stage);
            error!(stage, "{err:#}");
            if let Some(DeployError::Release {
                logs: Some(logs), ..
            }) = err.downcast_ref::<DeployError>()
            {
                eprintln!("--- container logs ---");
                eprintln!("{logs}");
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<()> {
    let seed = match &cli.config {
        Some(path) => DeployFile::load(path)?.into_input(),
        None => RequestInput::default(),
    };
    let input = prompt::collect(seed)?;
    let request = DeploymentRequest::validate(input)?;
    info!(
        repo = request.repo_url(),
        branch = request.branch(),
        host = %format!("{}@{}", request.ssh_user(), request.ssh_host()),
        port = request.app_port(),
        "input validated"
    );

    if cli.dry_run {
        dry_run(&request, cli.cleanup);
        return Ok(());
    }

    let key = request.ssh_key().display().to_string();
    let ssh = SshSession::new(request.ssh_host(), request.ssh_user(), &key);
    let probe = ReqwestProbe::new().context("building HTTP client")?;

    let report = Pipeline::new(&request, &Local, &ssh, &probe)
        .settle(Duration::from_secs(cli.settle_secs))
        .cleanup(cli.cleanup)
        .run()?;

    eprintln!();
    eprintln!("Deployment complete!");
    eprintln!("Application available at: http://{}/", request.ssh_host());
    if report.torn_down {
        eprintln!("Deployment removed again (--cleanup).");
    }
    Ok(())
}

fn dry_run(request: &DeploymentRequest, cleanup: bool) {
    let site = NginxSite::new(request.app_name(), request.app_port());

    eprintln!("=== Dry run: no changes will be made ===");
    eprintln!();

    eprintln!("--- {} ---", site.available_path());
    println!("{}", site.render());

    eprintln!("--- Actions that would be performed ---");
    for (i, step) in pipeline::plan(request, cleanup).iter().enumerate() {
        eprintln!("{}. {step}", i + 1);
    }
}
