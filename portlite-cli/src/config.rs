//! Config file layer and resolution of the final [`ExposeOptions`].
//!
//! Precedence, highest first: command-line flags (and their `PORTLITE_*`
//! environment variables), the config file, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use portlite::{ExposeOptions, LocalBindMode};
use portlite_shared::constants::config::{FILE_EXTENSIONS, FILE_STEM, SYSTEM_DIR, USER_SUBDIR};
use portlite_shared::{ControlTarget, PortliteError, PortliteResult};
use serde::Deserialize;

use crate::cli::Cli;

/// Settings that may come from a config file.
///
/// Transport settings must be strings: `control-vsock: 62373` is rejected,
/// `control-vsock: "62373"` is accepted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub control_pipe: Option<String>,
    pub control_vsock: Option<String>,
    pub local_bind: Option<LocalBindMode>,
    pub release_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Parse `contents`, choosing JSON or YAML by the file extension.
    pub fn parse(path: &Path, contents: &str) -> PortliteResult<Self> {
        let config_error = |reason: String| {
            PortliteError::Config(format!("in config file {}: {}", path.display(), reason))
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // YAML goes through a JSON value so scalars keep their YAML type.
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let value: serde_json::Value = if is_json {
            serde_json::from_str(contents).map_err(|e| config_error(e.to_string()))?
        } else {
            serde_yaml::from_str(contents).map_err(|e| config_error(e.to_string()))?
        };

        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| config_error(e.to_string()))
    }

    /// Read and parse the file at `path`.
    pub fn read(path: &Path) -> PortliteResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PortliteError::Config(format!("unable to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(path, &contents)
    }
}

/// Directories searched for `portlite-expose.{yaml,yml,json}`, in order.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(SYSTEM_DIR)];
    if let Some(config_dir) = dirs::config_dir() {
        dirs.push(config_dir.join(USER_SUBDIR));
    }
    dirs.push(PathBuf::from("."));
    dirs
}

/// First config file present in `dirs`.
pub fn find_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            FILE_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", FILE_STEM, ext)))
        })
        .find(|path| path.is_file())
}

/// Load the config file.
///
/// An explicit path must exist. Without one, the search directories are
/// tried and a missing file just means no file settings.
pub fn load(explicit: Option<&Path>) -> PortliteResult<FileConfig> {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "Reading config file");
        return FileConfig::read(path);
    }

    match find_in(&search_dirs()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Reading config file");
            FileConfig::read(&path)
        }
        None => {
            tracing::debug!("No config file found, using flags and defaults");
            Ok(FileConfig::default())
        }
    }
}

/// Combine flags and file settings into the options for one run.
///
/// The transport is resolved first so a missing control target is reported
/// before anything about the rule.
pub fn resolve(cli: &Cli, file: &FileConfig) -> PortliteResult<ExposeOptions> {
    let pipe = cli.control_pipe.as_deref().or(file.control_pipe.as_deref());
    let vsock = cli.control_vsock.as_deref().or(file.control_vsock.as_deref());
    let target = ControlTarget::resolve(pipe, vsock)?;

    let spec = cli.rule_spec();
    let rule = spec.build()?;
    for ip in spec.malformed_ips() {
        tracing::warn!(ip, "Unparseable IP address, treating it as unset");
    }

    let mut options = ExposeOptions::new(rule, target);
    if let Some(mode) = cli.local_bind_override().or(file.local_bind) {
        options = options.with_local_bind(mode);
    }
    if let Some(secs) = cli.release_timeout.or(file.release_timeout_secs) {
        options = options.with_release_timeout(Duration::from_secs(secs));
    }
    Ok(options)
}
