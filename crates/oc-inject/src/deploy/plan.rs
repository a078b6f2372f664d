//! Deployment planning
//!
//! Chooses how the manifest reaches the container and where every file
//! lands on both sides.

use camino::{Utf8Path, Utf8PathBuf};

use crate::manifest::{Fingerprint, Manifest, basename};
use crate::{Error, Result};

/// How the manifest is moved into the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A lone executable copied straight to a fingerprinted path
    DirectCopy,
    /// Everything staged locally, then synchronized as one directory
    StagedSync,
}

/// Immutable result of planning one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub strategy: Strategy,
    pub fingerprint: Fingerprint,
    /// Local directory holding the staged files (staged sync only)
    pub local_staging_dir: Option<Utf8PathBuf>,
    /// Container directory receiving the staged files (staged sync only)
    pub remote_target_dir: Option<Utf8PathBuf>,
    /// Where the executable ends up inside the container
    pub remote_executable_path: Utf8PathBuf,
}

impl DeploymentPlan {
    /// Remote location of an injected file, if the plan has a remote directory
    pub fn remote_path_of(&self, name: &str) -> Option<Utf8PathBuf> {
        self.remote_target_dir.as_ref().map(|dir| dir.join(name))
    }
}

/// Builds [`DeploymentPlan`]s
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    remote_tmp_dir: &'a Utf8Path,
    staging_root: &'a Utf8Path,
}

impl<'a> Planner<'a> {
    pub fn new(remote_tmp_dir: &'a Utf8Path, staging_root: &'a Utf8Path) -> Self {
        Self {
            remote_tmp_dir,
            staging_root,
        }
    }

    /// Plan the deployment of `manifest`
    pub fn plan(&self, manifest: &Manifest) -> Result<DeploymentPlan> {
        let executable = manifest.executable().ok_or_else(|| {
            Error::plan(
                "Nothing to deploy",
                "The manifest must contain at least the executable",
            )
        })?;

        let fingerprint = manifest.fingerprint();
        let exe_name = basename(Utf8Path::new(&executable.name));

        let plan = if manifest.len() == 1 {
            DeploymentPlan {
                strategy: Strategy::DirectCopy,
                remote_executable_path: self
                    .remote_tmp_dir
                    .join(format!("{}_{}", fingerprint, exe_name)),
                local_staging_dir: None,
                remote_target_dir: None,
                fingerprint,
            }
        } else {
            let remote_dir = self.remote_tmp_dir.join(fingerprint.as_str());
            DeploymentPlan {
                strategy: Strategy::StagedSync,
                remote_executable_path: remote_dir.join(exe_name),
                local_staging_dir: Some(self.staging_root.join(fingerprint.as_str())),
                remote_target_dir: Some(remote_dir),
                fingerprint,
            }
        };

        tracing::info!(
            strategy = ?plan.strategy,
            fingerprint = %plan.fingerprint,
            "Deploying {} file(s) to {}",
            manifest.len(),
            plan.remote_executable_path
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> Planner<'static> {
        Planner::new(Utf8Path::new("/tmp"), Utf8Path::new("."))
    }

    #[test]
    fn test_single_artifact_is_direct_copy() {
        let mut manifest = Manifest::new();
        manifest.add_item("true", "/bin/true");

        let plan = planner().plan(&manifest).unwrap();
        let fp = manifest.fingerprint();

        assert_eq!(plan.strategy, Strategy::DirectCopy);
        assert_eq!(plan.fingerprint, fp);
        assert!(plan.local_staging_dir.is_none());
        assert!(plan.remote_target_dir.is_none());
        assert_eq!(
            plan.remote_executable_path,
            Utf8PathBuf::from(format!("/tmp/{}_true", fp))
        );
        assert_eq!(plan.remote_path_of("true"), None);
    }

    #[test]
    fn test_many_artifacts_is_staged_sync() {
        let mut manifest = Manifest::new();
        manifest.add_item("app", "/build/app");
        manifest.add_item("liba.so", "/lib/liba.so");
        manifest.add_item("libb.so", "/lib/libb.so");

        let plan = planner().plan(&manifest).unwrap();
        let fp = manifest.fingerprint();

        assert_eq!(plan.strategy, Strategy::StagedSync);
        assert_eq!(
            plan.local_staging_dir,
            Some(Utf8PathBuf::from(format!("./{}", fp)))
        );
        assert_eq!(
            plan.remote_target_dir,
            Some(Utf8PathBuf::from(format!("/tmp/{}", fp)))
        );
        assert_eq!(
            plan.remote_executable_path,
            Utf8PathBuf::from(format!("/tmp/{}/app", fp))
        );
        assert_eq!(
            plan.remote_path_of("liba.so"),
            Some(Utf8PathBuf::from(format!("/tmp/{}/liba.so", fp)))
        );
    }

    #[test]
    fn test_two_artifacts_is_staged_sync() {
        let mut manifest = Manifest::new();
        manifest.add_item("app", "/build/app");
        manifest.add_item("liba.so", "/lib/liba.so");

        assert_eq!(
            planner().plan(&manifest).unwrap().strategy,
            Strategy::StagedSync
        );
    }

    #[test]
    fn test_empty_manifest_is_an_error() {
        let err = planner().plan(&Manifest::new()).unwrap_err();
        assert!(matches!(err, Error::Plan { .. }));
    }
}
