//! Integration test: stage a working copy from a local bare
//! repository with the real `git` binary.
//!
//! Skipped in normal `cargo test` runs unless the `integration`
//! feature is enabled.

#![cfg(feature = "integration")]

mod common;

use std::path::Path;
use std::process::Command;

use dockhand::SourceStager;
use dockhand::cmd::Local;
use dockhand::error::DeployError;
use dockhand::request::DeploymentRequest;
use dockhand::source::StageOutcome;

use common::{input_in, work_dir};

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Dockhand", "-c", "user.email=dockhand@example.com"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("git is installed");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Bare `origin.git` with one commit on `main`, plus the `seed`
/// clone used to push further commits.
fn origin(dir: &Path) -> String {
    let seed = dir.join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init", "-q", "-b", "main"]);
    std::fs::write(seed.join("Dockerfile"), "FROM scratch\n").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-q", "-m", "initial"]);
    git(dir, &["clone", "-q", "--bare", "seed", "origin.git"]);
    dir.join("origin.git").display().to_string()
}

fn request(dir: &Path, repo: &str, branch: &str) -> DeploymentRequest {
    let mut input = input_in(dir);
    input.repo_url = repo.to_string();
    input.branch = branch.to_string();
    DeploymentRequest::validate(input).unwrap()
}

#[test]
fn clones_then_pulls_new_commits() {
    let dir = tempfile::tempdir().unwrap();
    let repo = origin(dir.path());
    let request = request(dir.path(), &repo, "main");
    let stager = SourceStager::new(&Local);

    let first = stager.stage(&request).unwrap();
    assert!(matches!(first.outcome, StageOutcome::Cloned));
    assert!(work_dir(dir.path()).join("Dockerfile").is_file());
    assert_eq!(
        git(&work_dir(dir.path()), &["remote", "get-url", "origin"]),
        repo
    );

    let seed = dir.path().join("seed");
    std::fs::write(seed.join("index.html"), "<h1>v2</h1>\n").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-q", "-m", "second"]);
    git(&seed, &["push", "-q", &repo, "main"]);

    let second = stager.stage(&request).unwrap();
    assert!(matches!(second.outcome, StageOutcome::Updated));
    assert!(work_dir(dir.path()).join("index.html").is_file());
}

#[test]
fn missing_clone_branch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let repo = origin(dir.path());
    let request = request(dir.path(), &repo, "release");

    let err = SourceStager::new(&Local).stage(&request).unwrap_err();

    assert!(matches!(err, DeployError::CloneFailed { .. }));
}

#[test]
fn unknown_remote_branch_keeps_existing_tree() {
    let dir = tempfile::tempdir().unwrap();
    let repo = origin(dir.path());
    let stager = SourceStager::new(&Local);
    stager.stage(&request(dir.path(), &repo, "main")).unwrap();

    let artifact = stager
        .stage(&request(dir.path(), &repo, "feature"))
        .unwrap();

    assert!(matches!(
        artifact.outcome,
        StageOutcome::Stale(DeployError::PullFailed { .. })
    ));
    assert_eq!(
        git(&work_dir(dir.path()), &["rev-parse", "--abbrev-ref", "HEAD"]),
        "feature"
    );
    assert!(work_dir(dir.path()).join("Dockerfile").is_file());
}
