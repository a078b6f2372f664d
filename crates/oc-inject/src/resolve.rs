//! Dependency discovery
//!
//! Turns the dynamic linker's report on an executable into the ordered,
//! name-unique list of files that must be injected alongside it.
//!
//! `ldd` prints one dependency per line in one of three shapes:
//!
//! ```text
//! libfoo.so.1 => /usr/lib/libfoo.so.1 (0x00007f...)   resolved soname
//! linux-vdso.so.1 (0x00007ffd...)                      soname without a file
//! /lib64/ld-linux-x86-64.so.2 (0x00007f...)            the loader itself
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeSet, HashSet};

use crate::Result;
use crate::manifest::{RequiredArtifact, basename};
use crate::process::{CommandLine, CommandRunner};

/// One recognized line of dynamic-linker output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkerEntry {
    /// The dependency has a file on this machine
    Resolved { name: String, path: Utf8PathBuf },
    /// The dependency has no file (vDSO, or `=> not found`)
    Unresolved { name: String },
}

impl LinkerEntry {
    /// Parse one output line; unrecognized lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (body, has_address) = match strip_load_address(line) {
            Some(body) => (body, true),
            None => (line, false),
        };

        if let Some((name, target)) = body.split_once("=>") {
            let name = name.trim();
            let target = target.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return None;
            }
            if target.is_empty() || target == "not found" {
                return Some(Self::Unresolved {
                    name: name.to_string(),
                });
            }
            if !has_address || target.contains(char::is_whitespace) {
                return None;
            }
            // usrmerge hosts print the loader as `/lib64/ld.so => /usr/lib64/ld.so`
            let name = Utf8Path::new(name);
            let name = if name.is_absolute() { basename(name) } else { name.as_str() };
            return Some(Self::Resolved {
                name: name.to_string(),
                path: Utf8PathBuf::from(target),
            });
        }

        // Without "=>" only `<token> (0x...)` is a dependency line
        if !has_address || body.is_empty() || body.contains(char::is_whitespace) {
            return None;
        }

        let path = Utf8Path::new(body);
        if path.is_absolute() {
            Some(Self::Resolved {
                name: basename(path).to_string(),
                path: path.to_path_buf(),
            })
        } else {
            Some(Self::Unresolved {
                name: body.to_string(),
            })
        }
    }
}

/// Strip a trailing ` (0x...)` load address, returning what precedes it
fn strip_load_address(line: &str) -> Option<&str> {
    let inner = line.strip_suffix(')')?;
    let (body, address) = inner.rsplit_once('(')?;
    let digits = address.strip_prefix("0x")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(body.trim_end())
}

/// Parse a whole `ldd` report, skipping unrecognized lines
pub fn parse_linker_output(output: &str) -> Vec<LinkerEntry> {
    output
        .lines()
        .filter_map(|line| {
            tracing::trace!("ldd: {}", line);
            LinkerEntry::parse(line)
        })
        .collect()
}

/// Computes the dependency closure of an executable
pub struct Resolver<'a> {
    runner: &'a dyn CommandRunner,
    ldd: &'a str,
    exclude: BTreeSet<String>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver using `ldd` as the introspection command
    pub fn new<I, S>(runner: &'a dyn CommandRunner, ldd: &'a str, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            runner,
            ldd,
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Artifacts required by `executable`, the executable first.
    ///
    /// In static mode the linker is not consulted. A failing introspection
    /// command is returned unchanged.
    pub fn resolve(&self, executable: &Utf8Path, static_mode: bool) -> Result<Vec<RequiredArtifact>> {
        let exe = RequiredArtifact::new(basename(executable), executable);
        if static_mode {
            return Ok(vec![exe]);
        }

        let command = CommandLine::new(self.ldd).arg(executable.as_str());
        let output = self.runner.capture(&command)?;

        Ok(self.collect(exe, parse_linker_output(&output)))
    }

    /// Apply exclusions and de-duplicate by name, first occurrence wins
    fn collect(&self, exe: RequiredArtifact, entries: Vec<LinkerEntry>) -> Vec<RequiredArtifact> {
        let mut seen = HashSet::new();
        seen.insert(exe.name.clone());
        let mut artifacts = vec![exe];

        for entry in entries {
            let (name, path) = match entry {
                LinkerEntry::Resolved { name, path } => (name, path),
                LinkerEntry::Unresolved { name } => {
                    tracing::info!("Skipping unresolved dependency {}", name);
                    continue;
                }
            };

            if self.exclude.contains(&name) {
                tracing::info!("Excluding {} (using the container's copy)", name);
                continue;
            }

            if seen.insert(name.clone()) {
                artifacts.push(RequiredArtifact::new(name, path));
            } else {
                tracing::debug!("Ignoring duplicate dependency {}", name);
            }
        }

        artifacts
    }
}
