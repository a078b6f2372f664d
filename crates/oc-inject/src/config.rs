//! Configuration file parsing and merging
//!
//! This module handles parsing of `oc-inject.toml` and `oc-inject.local.toml`.
//! Both files are optional; the local file overrides the base one.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;

/// Base configuration file name
pub const CONFIG_FILE: &str = "oc-inject.toml";

/// Local override configuration file name
pub const LOCAL_CONFIG_FILE: &str = "oc-inject.local.toml";

/// Dynamic loader file names for the architectures we know about
const BUILTIN_LOADERS: &[(&str, &str)] = &[
    ("x86_64", "ld-linux-x86-64.so.2"),
    ("aarch64", "ld-linux-aarch64.so.1"),
    ("x86", "ld-linux.so.2"),
    ("powerpc64", "ld64.so.2"),
    ("s390x", "ld64.so.1"),
    ("riscv64", "ld-linux-riscv64-lp64d.so.1"),
];

/// Main configuration structure for oc-inject
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External commands
    pub platform: PlatformConfig,

    /// Staging and remote layout
    pub deploy: DeployConfig,

    /// Custom dynamic loader selection
    pub loader: LoaderConfig,
}

/// External command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Container-platform client (default: "oc")
    pub command: String,

    /// Dynamic-linker introspection command (default: "ldd")
    pub ldd: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            command: "oc".to_string(),
            ldd: "ldd".to_string(),
        }
    }
}

/// Deployment layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Temporary directory inside the container (default: "/tmp")
    pub remote_tmp_dir: Utf8PathBuf,

    /// Local parent directory of staging directories (default: ".")
    pub staging_root: Utf8PathBuf,

    /// Libraries to take from the container instead of injecting
    pub exclude: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            remote_tmp_dir: Utf8PathBuf::from("/tmp"),
            staging_root: Utf8PathBuf::from("."),
            exclude: Vec::new(),
        }
    }
}

/// Dynamic loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Target architecture (default: the host architecture)
    pub arch: String,

    /// Architecture to loader file name, on top of the built-in table
    pub names: BTreeMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            names: BTreeMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Loader file name for the configured architecture
    pub fn loader_name(&self) -> Option<&str> {
        if let Some(name) = self.names.get(&self.arch) {
            return Some(name.as_str());
        }
        BUILTIN_LOADERS
            .iter()
            .find(|(arch, _)| *arch == self.arch)
            .map(|(_, name)| *name)
    }
}

impl Config {
    /// Load configuration from a directory.
    ///
    /// This loads `oc-inject.toml` and merges `oc-inject.local.toml` over it
    /// when either exists.
    pub fn load(dir: &Utf8Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let local_config_path = dir.join(LOCAL_CONFIG_FILE);

        let base_config = if config_path.exists() {
            tracing::debug!("Loading {}", config_path);
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let merged = if local_config_path.exists() {
            tracing::debug!("Loading {}", local_config_path);
            let content = std::fs::read_to_string(&local_config_path)?;
            merge_toml_values(base_config, toml::from_str::<toml::Value>(&content)?)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;
        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.platform.command, "oc");
        assert_eq!(config.platform.ldd, "ldd");
        assert_eq!(config.deploy.remote_tmp_dir, Utf8PathBuf::from("/tmp"));
        assert_eq!(config.deploy.staging_root, Utf8PathBuf::from("."));
        assert!(config.deploy.exclude.is_empty());
        assert_eq!(config.loader.arch, std::env::consts::ARCH);
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[platform]
command = "kubectl"
ldd = "/usr/bin/ldd"

[deploy]
remote_tmp_dir = "/var/tmp"
staging_root = "/scratch"
exclude = ["libc.so.6"]

[loader]
arch = "aarch64"

[loader.names]
aarch64 = "ld-custom.so.1"
"#;

        let config = Config::parse(content).unwrap();

        assert_eq!(config.platform.command, "kubectl");
        assert_eq!(config.platform.ldd, "/usr/bin/ldd");
        assert_eq!(config.deploy.remote_tmp_dir, Utf8PathBuf::from("/var/tmp"));
        assert_eq!(config.deploy.staging_root, Utf8PathBuf::from("/scratch"));
        assert_eq!(config.deploy.exclude, vec!["libc.so.6"]);
        assert_eq!(config.loader.loader_name(), Some("ld-custom.so.1"));
    }

    #[test]
    fn test_loader_name_falls_back_to_builtin_table() {
        let mut loader = LoaderConfig {
            arch: "x86_64".to_string(),
            names: BTreeMap::new(),
        };
        assert_eq!(loader.loader_name(), Some("ld-linux-x86-64.so.2"));

        loader.arch = "s390x".to_string();
        assert_eq!(loader.loader_name(), Some("ld64.so.1"));

        loader.arch = "mips".to_string();
        assert_eq!(loader.loader_name(), None);

        loader.names.insert("mips".to_string(), "ld.so.1".to_string());
        assert_eq!(loader.loader_name(), Some("ld.so.1"));
    }

    #[test]
    fn test_merge_configs_via_toml_value() {
        let base = r#"
[platform]
command = "kubectl"

[deploy]
remote_tmp_dir = "/var/tmp"
exclude = ["libc.so.6", "libm.so.6"]
"#;

        let local = r#"
[deploy]
exclude = ["libstdc++.so.6"]
"#;

        let base_value: toml::Value = toml::from_str(base).unwrap();
        let local_value: toml::Value = toml::from_str(local).unwrap();
        let merged: Config = merge_toml_values(base_value, local_value)
            .try_into()
            .unwrap();

        // Untouched values survive the merge
        assert_eq!(merged.platform.command, "kubectl");
        assert_eq!(merged.deploy.remote_tmp_dir, Utf8PathBuf::from("/var/tmp"));

        // Arrays are replaced, not concatenated
        assert_eq!(merged.deploy.exclude, vec!["libstdc++.so.6"]);
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        std::fs::write(
            dir.join(CONFIG_FILE),
            "[platform]\ncommand = \"kubectl\"\nldd = \"ldd\"\n",
        )
        .unwrap();
        std::fs::write(dir.join(LOCAL_CONFIG_FILE), "[platform]\nldd = \"my-ldd\"\n").unwrap();

        let config = Config::load(dir).unwrap();

        assert_eq!(config.platform.command, "kubectl");
        assert_eq!(config.platform.ldd, "my-ldd");
    }

    #[test]
    fn test_load_missing_config_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        let config = Config::load(dir).unwrap();

        assert_eq!(config.platform.command, "oc");
        assert!(config.deploy.exclude.is_empty());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let err = Config::parse("[deploy]\nexclude = 3\n").unwrap_err();
        assert!(matches!(err, crate::Error::TomlParse(_)));
    }
}
