//! Running the injected executable inside the container
//!
//! The remote argument vector is
//!
//! ```text
//! [env LD_LIBRARY_PATH=<dir> LD_PRELOAD=<loader> K=V ...] [<loader>] <exe> <args...>
//! ```
//!
//! where the `env` wrapper appears only when at least one assignment is
//! needed.

use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

use crate::process::{CommandLine, CommandRunner};
use crate::{Error, Result};

use super::plan::DeploymentPlan;
use super::platform::Platform;

/// Library search path variable, set in staged mode
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Loader preload variable, set in custom-loader mode
pub const PRELOAD_VAR: &str = "LD_PRELOAD";

/// A single `KEY=VALUE` environment assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAssignment {
    pub key: String,
    pub value: String,
}

impl EnvAssignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a space-separated list such as `"A=1 B=2"`
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        list.split_whitespace().map(str::parse).collect()
    }
}

impl FromStr for EnvAssignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(Error::config(
                format!("Invalid environment assignment: {}", s),
                "Use KEY=VALUE, separating several assignments with spaces",
            )),
        }
    }
}

impl fmt::Display for EnvAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// What to run and how to attach to it
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Attach stdin
    pub stdin: bool,
    /// Allocate a TTY
    pub tty: bool,
    /// Remote path of the injected dynamic loader, when it should be used
    pub loader: Option<Utf8PathBuf>,
    /// Extra assignments requested by the user
    pub env: Vec<EnvAssignment>,
    /// Arguments forwarded to the executable
    pub args: Vec<String>,
}

/// Environment the executable needs in the container
pub fn remote_environment(plan: &DeploymentPlan, options: &LaunchOptions) -> Vec<EnvAssignment> {
    let mut env = Vec::new();

    if let Some(dir) = &plan.remote_target_dir {
        env.push(EnvAssignment::new(LIBRARY_PATH_VAR, dir.as_str()));
    }
    if let Some(loader) = &options.loader {
        env.push(EnvAssignment::new(PRELOAD_VAR, loader.as_str()));
    }
    env.extend(options.env.iter().cloned());

    env
}

/// Argument vector run inside the container
pub fn remote_argv(plan: &DeploymentPlan, options: &LaunchOptions) -> Vec<String> {
    let env = remote_environment(plan, options);
    let mut argv = Vec::new();

    if !env.is_empty() {
        argv.push("env".to_string());
        argv.extend(env.iter().map(ToString::to_string));
    }
    // The loader takes the executable as an argument instead of being
    // picked up from its ELF header
    if let Some(loader) = &options.loader {
        argv.push(loader.to_string());
    }
    argv.push(plan.remote_executable_path.to_string());
    argv.extend(options.args.iter().cloned());

    argv
}

/// Full platform `exec` command for `plan`
pub fn build_command(
    platform: &Platform<'_>,
    plan: &DeploymentPlan,
    options: &LaunchOptions,
) -> CommandLine {
    platform.exec(options.stdin, options.tty, remote_argv(plan, options))
}

/// Run the launch command and return the remote program's exit status
pub fn launch(runner: &dyn CommandRunner, command: &CommandLine) -> Result<i32> {
    let status = runner.run(command)?;
    if status != 0 {
        tracing::info!("Remote program exited with status {}", status);
    }
    Ok(status)
}
