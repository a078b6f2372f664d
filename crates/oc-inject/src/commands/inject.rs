//! Inject command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;

use crate::config::Config;
use crate::deploy::{self, EnvAssignment, InjectRequest, LoaderChoice, PodTarget};
use crate::logging::LogConfig;
use crate::process::SystemRunner;
use crate::{Error, Result};

/// Arguments for injecting and running an executable
#[derive(Debug, Clone, Args)]
pub struct InjectArgs {
    /// Pod to inject into
    pub pod: String,

    /// Local executable (path, or command name looked up on PATH)
    pub executable: String,

    /// Arguments passed to the executable (put `--` before them if they
    /// look like oc-inject options)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Container within the pod
    #[arg(short, long)]
    pub container: Option<String>,

    /// Pass stdin to the container
    #[arg(short = 'i', long)]
    pub stdin: bool,

    /// Allocate a TTY in the container
    #[arg(short, long)]
    pub tty: bool,

    /// Treat the executable as static and inject it alone
    #[arg(short = 's', long = "static")]
    pub static_mode: bool,

    /// Show the commands that would run without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Platform client command (default: oc)
    #[arg(long, value_name = "CMD")]
    pub oc_command: Option<String>,

    /// Run the executable through the injected dynamic loader
    #[arg(short = 'l', long)]
    pub custom_loader: bool,

    /// Dynamic loader to inject, by local path or file name (implies --custom-loader)
    #[arg(long, value_name = "PATH")]
    pub loader: Option<String>,

    /// Extra environment, e.g. "FOO=1 BAR=2"
    #[arg(short = 'E', long = "env", value_name = "ASSIGNMENTS")]
    pub env: Vec<String>,

    /// Use the container's copy of this library instead of injecting it
    #[arg(short = 'x', long, value_name = "SONAME")]
    pub exclude: Vec<String>,
}

impl InjectArgs {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref command) = self.oc_command {
            config.platform.command = command.clone();
        }
        config.deploy.exclude.extend(self.exclude.iter().cloned());
    }

    fn loader_choice(&self, cwd: &Utf8Path) -> Option<LoaderChoice> {
        match &self.loader {
            Some(loader) if loader.contains('/') => Some(LoaderChoice::Path(cwd.join(loader))),
            Some(loader) => Some(LoaderChoice::Named(loader.clone())),
            None if self.custom_loader => Some(LoaderChoice::Configured),
            None => None,
        }
    }

    /// Build the injection request, validating user input
    pub fn to_request(&self, cwd: &Utf8Path, path_var: Option<&str>) -> Result<InjectRequest> {
        let mut env = Vec::new();
        for list in &self.env {
            env.extend(EnvAssignment::parse_list(list)?);
        }

        let executable = deploy::locate_executable(&self.executable, cwd, path_var)?;

        Ok(InjectRequest {
            target: PodTarget::new(&self.pod, self.container.clone()),
            executable,
            static_mode: self.static_mode,
            stdin: self.stdin,
            tty: self.tty,
            loader: self.loader_choice(cwd),
            env,
            args: self.args.clone(),
        })
    }
}

/// Run the inject command, returning the remote exit status
pub fn run(args: InjectArgs, log: LogConfig) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
        Error::config(
            format!("Current directory is not valid UTF-8: {}", e),
            "Run oc-inject from a directory with a UTF-8 path",
        )
    })?;

    let mut config = Config::load(&cwd)?;
    args.apply_to(&mut config);

    let path_var = std::env::var("PATH").ok();
    let request = args.to_request(&cwd, path_var.as_deref())?;

    let runner = SystemRunner::new(log);
    deploy::inject(&runner, &config, &request)
}
