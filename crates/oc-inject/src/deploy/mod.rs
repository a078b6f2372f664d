//! Injection pipeline
//!
//! This module wires the pipeline together:
//! - Discovery: the executable's dependency closure ([`crate::resolve`])
//! - Manifest and fingerprint ([`crate::manifest`])
//! - Planning: direct copy or staged sync ([`plan`])
//! - Transfer into the container ([`transfer`])
//! - Launch with the synthesized environment ([`launch`])
//!
//! **Note**: staging and remote directories are named by the manifest
//! fingerprint only. Concurrent runs with the same dependency closure share
//! them.

pub mod launch;
pub mod plan;
pub mod platform;
pub mod transfer;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Config;
use crate::manifest::{Manifest, basename};
use crate::process::CommandRunner;
use crate::resolve::Resolver;
use crate::{Error, Result};

pub use launch::{EnvAssignment, LaunchOptions};
pub use plan::{DeploymentPlan, Planner, Strategy};
pub use platform::{Platform, PodTarget};

/// Which dynamic loader runs the executable in custom-loader mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderChoice {
    /// The configured loader for the target architecture
    Configured,
    /// A loader file name expected in the dependency closure
    Named(String),
    /// A local loader file injected in addition to the closure
    Path(Utf8PathBuf),
}

/// Everything one invocation asks for
#[derive(Debug, Clone)]
pub struct InjectRequest {
    pub target: PodTarget,
    /// Absolute local path of the executable
    pub executable: Utf8PathBuf,
    /// Skip dynamic-linker discovery
    pub static_mode: bool,
    pub stdin: bool,
    pub tty: bool,
    /// Run through an injected dynamic loader
    pub loader: Option<LoaderChoice>,
    pub env: Vec<EnvAssignment>,
    pub args: Vec<String>,
}

/// Deploy the executable described by `request` and run it.
///
/// Returns the remote program's exit status.
pub fn inject(runner: &dyn CommandRunner, config: &Config, request: &InjectRequest) -> Result<i32> {
    let resolver = Resolver::new(
        runner,
        &config.platform.ldd,
        config.deploy.exclude.iter().cloned(),
    );
    let artifacts = resolver.resolve(&request.executable, request.static_mode)?;

    let mut manifest = Manifest::new();
    for artifact in artifacts {
        manifest.add_item(artifact.name, artifact.local_path);
    }

    let loader_name = match &request.loader {
        Some(choice) => Some(select_loader(config, choice, &mut manifest)?),
        None => None,
    };

    let plan = Planner::new(&config.deploy.remote_tmp_dir, &config.deploy.staging_root)
        .plan(&manifest)?;

    let loader = match loader_name {
        Some(name) => Some(plan.remote_path_of(&name).ok_or_else(|| {
            Error::plan(
                "A custom loader needs the staged deployment mode",
                "The loader must be injected together with the executable",
            )
        })?),
        None => None,
    };

    let platform = Platform::new(&config.platform.command, &request.target);
    transfer::execute(runner, &platform, &manifest, &plan)?;

    let options = LaunchOptions {
        stdin: request.stdin,
        tty: request.tty,
        loader,
        env: request.env.clone(),
        args: request.args.clone(),
    };
    let command = launch::build_command(&platform, &plan, &options);
    launch::launch(runner, &command)
}

/// Resolve the loader to a manifest entry, adding it when given as a path
fn select_loader(config: &Config, choice: &LoaderChoice, manifest: &mut Manifest) -> Result<String> {
    let name = match choice {
        LoaderChoice::Configured => config
            .loader
            .loader_name()
            .ok_or_else(|| {
                Error::config(
                    format!("No dynamic loader known for architecture {}", config.loader.arch),
                    "Add it under [loader.names] in oc-inject.toml or pass --loader",
                )
            })?
            .to_string(),
        LoaderChoice::Named(name) => name.clone(),
        LoaderChoice::Path(path) => {
            let name = basename(path).to_string();
            if !manifest.contains(&name) {
                manifest.add_item(name.clone(), path.clone());
            }
            name
        }
    };

    if !manifest.contains(&name) {
        return Err(Error::plan(
            format!("Dynamic loader {} is not part of the dependency closure", name),
            "Pass --loader with the local path of the loader to inject",
        ));
    }

    tracing::info!("Using injected dynamic loader {}", name);
    Ok(name)
}

/// Locate an executable given on the command line.
///
/// Arguments containing `/` are taken relative to `cwd`; bare names are
/// looked up on `path_var` like a shell would.
pub fn locate_executable(
    arg: &str,
    cwd: &Utf8Path,
    path_var: Option<&str>,
) -> Result<Utf8PathBuf> {
    let not_found = || {
        Error::discovery(
            format!("Executable not found: {}", arg),
            "Pass a path to a local file or a command on PATH",
        )
    };

    if arg.contains('/') {
        let path = cwd.join(arg);
        return if path.is_file() { Ok(path) } else { Err(not_found()) };
    }

    path_var
        .into_iter()
        .flat_map(|paths| paths.split(':'))
        .filter(|dir| !dir.is_empty())
        .map(|dir| cwd.join(dir).join(arg))
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)
}
