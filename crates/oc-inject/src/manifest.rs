//! Injection manifest and its fingerprint
//!
//! A [`Manifest`] is the ordered list of files a deployment injects, the
//! executable first. Its [`Fingerprint`] names the staging and remote
//! directories, so identical dependency closures reuse the same paths and
//! different closures never share them.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Identifier prefixed to fingerprints and hashed into them
pub const TOOL_NAME: &str = "oc-inject";

/// Number of hex characters kept from the digest (8 bytes)
pub const FINGERPRINT_HEX_LEN: usize = 16;

/// One file to inject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredArtifact {
    /// File name exposed in the container (soname or executable basename)
    pub name: String,
    /// Location on this machine
    pub local_path: Utf8PathBuf,
}

impl RequiredArtifact {
    pub fn new(name: impl Into<String>, local_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
        }
    }
}

/// Short content identifier of a manifest, e.g. `oc-inject-1f2e3d4c5b6a7988`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered record of everything a deployment injects
#[derive(Debug, Clone)]
pub struct Manifest {
    tool: String,
    artifacts: Vec<RequiredArtifact>,
    signature: String,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    pub fn new() -> Self {
        let tool = format!("{} {}", TOOL_NAME, env!("CARGO_PKG_VERSION"));
        let signature = format!("{}\n", tool);
        Self {
            tool,
            artifacts: Vec::new(),
            signature,
        }
    }

    /// Append an artifact.
    ///
    /// Duplicates are not filtered here; the resolver hands over a list that
    /// is already unique by name.
    pub fn add_item(&mut self, name: impl Into<String>, local_path: impl Into<Utf8PathBuf>) {
        let artifact = RequiredArtifact::new(name, local_path);
        let line = format!("{} => {}", artifact.name, artifact.local_path);

        tracing::info!("+ {}", line);
        self.signature.push_str(&line);
        self.signature.push('\n');
        self.artifacts.push(artifact);
    }

    /// Artifacts in insertion order
    pub fn artifacts(&self) -> &[RequiredArtifact] {
        &self.artifacts
    }

    /// The executable, which is always added first
    pub fn executable(&self) -> Option<&RequiredArtifact> {
        self.artifacts.first()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.iter().any(|a| a.name == name)
    }

    /// Human-readable log of every addition
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Hash of the tool identity and the artifact records.
    ///
    /// The records are hashed in a fixed encoding rather than through the
    /// signature text, so log formatting never moves a fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.tool.as_bytes());
        hasher.update(b"\n");

        for artifact in &self.artifacts {
            hasher.update(artifact.name.as_bytes());
            hasher.update(b"\0");
            hasher.update(artifact.local_path.as_str().as_bytes());
            hasher.update(b"\n");
        }

        let hex = hasher.finalize().to_hex();
        Fingerprint(format!("{}-{}", TOOL_NAME, &hex.as_str()[..FINGERPRINT_HEX_LEN]))
    }
}

/// Final path component, or the whole path when there is none
pub fn basename(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}
