//! Container-platform client invocations (`oc` / `kubectl`)

use camino::Utf8Path;

use crate::process::CommandLine;

/// Pod and optional container that receive the injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTarget {
    pub pod: String,
    pub container: Option<String>,
}

impl PodTarget {
    pub fn new(pod: impl Into<String>, container: Option<String>) -> Self {
        Self {
            pod: pod.into(),
            container,
        }
    }

    /// `<pod>:<path>` as understood by `cp` and `rsync`
    fn remote(&self, path: &Utf8Path) -> String {
        format!("{}:{}", self.pod, path)
    }
}

/// Builds platform client command lines for one target
#[derive(Debug, Clone, Copy)]
pub struct Platform<'a> {
    client: &'a str,
    target: &'a PodTarget,
}

impl<'a> Platform<'a> {
    pub fn new(client: &'a str, target: &'a PodTarget) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &PodTarget {
        self.target
    }

    fn with_container(&self, command: CommandLine) -> CommandLine {
        match &self.target.container {
            Some(container) => command.arg("-c").arg(container),
            None => command,
        }
    }

    /// Copy one local file to a path in the container
    pub fn copy(&self, local: &Utf8Path, remote: &Utf8Path) -> CommandLine {
        let command = CommandLine::new(self.client)
            .arg("cp")
            .arg(local.as_str())
            .arg(self.target.remote(remote));
        self.with_container(command)
    }

    /// Synchronize the contents of a local directory into a container directory.
    ///
    /// The trailing slash on the source makes the files land directly in
    /// `remote_dir` instead of a nested subdirectory.
    pub fn sync(&self, local_dir: &Utf8Path, remote_dir: &Utf8Path) -> CommandLine {
        let source = format!("{}/", local_dir.as_str().trim_end_matches('/'));
        let command = CommandLine::new(self.client)
            .arg("rsync")
            .arg(source)
            .arg(self.target.remote(remote_dir));
        self.with_container(command)
    }

    /// Execute `argv` in the container
    pub fn exec<I, S>(&self, stdin: bool, tty: bool, argv: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = CommandLine::new(self.client).arg("exec");
        if stdin {
            command = command.arg("-i");
        }
        if tty {
            command = command.arg("-t");
        }
        command = self.with_container(command.arg(&self.target.pod));
        command.arg("--").args(argv)
    }
}
