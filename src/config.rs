//! Shell configuration
//!
//! `ShellConfig` is what an embedding task runner hands to `Shell::new`:
//! initial variables, working directory, `$0`/positional parameters,
//! option defaults and execution limits. It can be built in code or
//! loaded from TOML:
//!
//! ```toml
//! cwd = "/srv/project"
//! script_name = "build"
//! args = ["release"]
//!
//! [env]
//! TARGET = "x86_64"
//!
//! [options]
//! errexit = true
//! pipefail = true
//!
//! [shopt]
//! extglob = true
//!
//! [limits]
//! max_call_depth = 200
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::interpreter::types::{ExecutionLimits, ShellOptions, ShoptOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Initial variables; every entry is exported.
    pub env: BTreeMap<String, String>,
    /// Working directory; the host's current directory when unset.
    pub cwd: Option<PathBuf>,
    /// `$0`
    pub script_name: Option<String>,
    /// `$1`...
    pub args: Vec<String>,
    pub options: ShellOptions,
    pub shopt: ShoptOptions,
    pub limits: ExecutionLimits,
}

impl ShellConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Add variables, keeping entries already present.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            self.env.entry(name.into()).or_insert_with(|| value.into());
        }
        self
    }
}
