//! External command execution
//!
//! Commands are carried as a program plus an argument vector and are never
//! joined into a single string for execution. The shell-quoted rendering
//! produced by [`CommandLine`]'s `Display` impl is only used for logs and
//! error messages.
//!
//! Every external collaborator (platform client, dynamic-linker
//! introspection) is reached through the [`CommandRunner`] trait so the
//! pipeline can run against a recording implementation in tests.

use std::borrow::Cow;
use std::fmt;
use std::process::{Command, ExitStatus, Stdio};

use crate::logging::LogConfig;
use crate::{Error, Result};

/// A program and its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.argv().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&shell_escape::unix::escape(Cow::Borrowed(word)))?;
        }
        Ok(())
    }
}

/// Runs external commands on behalf of the pipeline
pub trait CommandRunner {
    /// Run a command with inherited stdio and return its exit status.
    ///
    /// A non-zero status is returned as `Ok`; only a failure to start the
    /// command is an error. Under dry run the command is logged and `Ok(0)`
    /// is returned without running it.
    fn run(&self, command: &CommandLine) -> Result<i32>;

    /// Run a read-only query and capture its stdout.
    ///
    /// Queries run even under dry run since they change nothing. A non-zero
    /// status is an [`Error::CommandFailed`].
    fn capture(&self, command: &CommandLine) -> Result<String>;

    /// Whether side effects are suppressed
    fn dry_run(&self) -> bool;
}

/// Run a command and turn a non-zero status into an error
pub fn run_checked(runner: &dyn CommandRunner, command: &CommandLine) -> Result<()> {
    match runner.run(command)? {
        0 => Ok(()),
        code => Err(Error::command_failed(command.to_string(), code, None)),
    }
}

/// [`CommandRunner`] backed by real processes
#[derive(Debug, Clone)]
pub struct SystemRunner {
    log: LogConfig,
}

impl SystemRunner {
    pub fn new(log: LogConfig) -> Self {
        Self { log }
    }

    fn spawn_error(command: &CommandLine, source: std::io::Error) -> Error {
        Error::Spawn {
            command: command.to_string(),
            source,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<i32> {
        if self.log.dry_run {
            tracing::info!("(dry run) {}", command);
            return Ok(0);
        }

        tracing::debug!("Running: {}", command);

        let status = command
            .to_command()
            .status()
            .map_err(|e| Self::spawn_error(command, e))?;

        Ok(status_code(status))
    }

    fn capture(&self, command: &CommandLine) -> Result<String> {
        tracing::debug!("Running: {}", command);

        let output = command
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::command_failed(
                command.to_string(),
                status_code(output.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn dry_run(&self) -> bool {
        self.log.dry_run
    }
}

/// Exit status as a single number; signal deaths map to `128 + signal`
fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Records every command and replays canned results
    #[derive(Default)]
    pub struct RecordingRunner {
        pub dry_run: bool,
        pub ran: RefCell<Vec<CommandLine>>,
        pub captured: RefCell<Vec<CommandLine>>,
        pub statuses: RefCell<VecDeque<i32>>,
        pub output: String,
    }

    impl RecordingRunner {
        pub fn with_output(output: &str) -> Self {
            Self {
                output: output.to_string(),
                ..Self::default()
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &CommandLine) -> Result<i32> {
            self.ran.borrow_mut().push(command.clone());
            if self.dry_run {
                return Ok(0);
            }
            Ok(self.statuses.borrow_mut().pop_front().unwrap_or(0))
        }

        fn capture(&self, command: &CommandLine) -> Result<String> {
            self.captured.borrow_mut().push(command.clone());
            Ok(self.output.clone())
        }

        fn dry_run(&self) -> bool {
            self.dry_run
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_display_quotes_only_when_needed() {
        let command = CommandLine::new("oc")
            .arg("exec")
            .arg("my pod")
            .args(["--", "echo", "it's"]);

        assert_eq!(command.to_string(), r"oc exec 'my pod' -- echo 'it'\''s'");
    }

    #[test]
    fn test_argv_keeps_embedded_spaces_in_one_word() {
        let command = CommandLine::new("env").arg("A=x y");
        let argv: Vec<_> = command.argv().collect();
        assert_eq!(argv, vec!["env", "A=x y"]);
    }

    #[test]
    fn test_run_checked_maps_failure_status() {
        let runner = RecordingRunner::default();
        runner.statuses.borrow_mut().push_back(4);

        let err = run_checked(&runner, &CommandLine::new("oc").arg("cp")).unwrap_err();
        match err {
            Error::CommandFailed { command, code, .. } => {
                assert_eq!(command, "oc cp");
                assert_eq!(code, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_system_runner_dry_run_does_not_execute() {
        let runner = SystemRunner::new(LogConfig::new(LogLevel::Quiet, true));
        let status = runner
            .run(&CommandLine::new("/nonexistent/oc-inject-test-binary"))
            .unwrap();
        assert_eq!(status, 0);
        assert!(runner.dry_run());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_status() {
        let runner = SystemRunner::new(LogConfig::new(LogLevel::Quiet, false));
        let status = runner
            .run(&CommandLine::new("sh").args(["-c", "exit 7"]))
            .unwrap();
        assert_eq!(status, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_capture() {
        let runner = SystemRunner::new(LogConfig::new(LogLevel::Quiet, true));
        let out = runner
            .capture(&CommandLine::new("sh").args(["-c", "echo hello"]))
            .unwrap();
        assert_eq!(out.trim(), "hello");

        let err = runner
            .capture(&CommandLine::new("sh").args(["-c", "echo oops >&2; exit 2"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_system_runner_spawn_failure() {
        let runner = SystemRunner::new(LogConfig::new(LogLevel::Quiet, false));
        let err = runner
            .run(&CommandLine::new("/nonexistent/oc-inject-test-binary"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
