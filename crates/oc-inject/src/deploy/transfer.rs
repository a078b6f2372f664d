//! Moving the manifest into the container
//!
//! A direct copy issues a single `cp`. A staged sync first assembles every
//! file under its injected name in the local staging directory, then pushes
//! the directory with one `rsync`. Under dry run nothing is written locally
//! and no command runs, but every step is still logged.

use camino::{Utf8Component, Utf8Path};

use crate::manifest::Manifest;
use crate::process::{CommandRunner, run_checked};
use crate::{Error, Result};

use super::plan::{DeploymentPlan, Strategy};
use super::platform::Platform;

/// Execute the transfer half of `plan`
pub fn execute(
    runner: &dyn CommandRunner,
    platform: &Platform<'_>,
    manifest: &Manifest,
    plan: &DeploymentPlan,
) -> Result<()> {
    match plan.strategy {
        Strategy::DirectCopy => direct_copy(runner, platform, manifest, plan),
        Strategy::StagedSync => staged_sync(runner, platform, manifest, plan),
    }
}

fn direct_copy(
    runner: &dyn CommandRunner,
    platform: &Platform<'_>,
    manifest: &Manifest,
    plan: &DeploymentPlan,
) -> Result<()> {
    let executable = manifest.executable().ok_or_else(|| {
        Error::transfer("Nothing to copy", "The manifest must contain the executable")
    })?;

    run_checked(
        runner,
        &platform.copy(&executable.local_path, &plan.remote_executable_path),
    )
}

fn staged_sync(
    runner: &dyn CommandRunner,
    platform: &Platform<'_>,
    manifest: &Manifest,
    plan: &DeploymentPlan,
) -> Result<()> {
    let (Some(staging_dir), Some(remote_dir)) = (&plan.local_staging_dir, &plan.remote_target_dir)
    else {
        return Err(Error::transfer(
            "Staged sync planned without staging and remote directories",
            "This is likely a bug in oc-inject",
        ));
    };

    stage(manifest, staging_dir, runner.dry_run())?;
    run_checked(runner, &platform.sync(staging_dir, remote_dir))
}

/// Check that `name` stays inside the directory it is joined to
fn check_artifact_name(name: &str) -> Result<()> {
    let mut components = Utf8Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::transfer(
            format!("Refusing to stage artifact with name {:?}", name),
            "Artifact names must be plain file names",
        )),
    }
}

/// Copy every artifact into `staging_dir` under its injected name
pub fn stage(manifest: &Manifest, staging_dir: &Utf8Path, dry_run: bool) -> Result<()> {
    for artifact in manifest.artifacts() {
        check_artifact_name(&artifact.name)?;
    }

    if dry_run {
        tracing::info!("(dry run) mkdir -p {}", staging_dir);
    } else {
        tracing::debug!("Creating staging directory {}", staging_dir);
        std::fs::create_dir_all(staging_dir).map_err(|e| {
            Error::transfer(
                format!("Failed to create staging directory {}: {}", staging_dir, e),
                "Check permissions of the staging root",
            )
        })?;
    }

    for artifact in manifest.artifacts() {
        let dst = staging_dir.join(&artifact.name);

        if dry_run {
            tracing::info!("(dry run) cp {} {}", artifact.local_path, dst);
            continue;
        }

        tracing::debug!("Staging {} as {}", artifact.local_path, dst);
        // Replace rather than write through, the previous copy may be read-only
        if dst.exists() || dst.is_symlink() {
            std::fs::remove_file(&dst).map_err(|e| {
                Error::transfer(
                    format!("Failed to replace staged file {}: {}", dst, e),
                    "Check permissions of the staging directory",
                )
            })?;
        }
        std::fs::copy(&artifact.local_path, &dst).map_err(|e| {
            Error::transfer(
                format!("Failed to stage {}: {}", artifact.local_path, e),
                "Check that the file exists and is readable",
            )
        })?;
    }

    Ok(())
}
