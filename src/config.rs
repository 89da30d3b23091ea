//! Configuration loading via `ortho-config`.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::drain::{DEFAULT_DELETE_CONCURRENCY, DrainSettings};
use crate::policy::Termination;
use crate::probe::MAX_PROBE_TIMEOUT;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Janitor settings derived from environment variables and configuration
/// files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "KUBE_JANITOR")]
pub struct JanitorConfig {
    /// Explicit kubeconfig path. When absent, or when the file cannot be
    /// used, the default resolution chain applies.
    pub kubeconfig: Option<String>,
    /// Namespace override; defaults to the kubeconfig context's namespace.
    pub namespace: Option<String>,
    /// Connect timeout for the reachability probe, in milliseconds.
    #[ortho_config(default = 500)]
    pub probe_timeout_ms: u64,
    /// Maximum number of deletes in flight during one drain iteration.
    #[ortho_config(default = 8)]
    pub delete_concurrency: usize,
    /// Pause between drain iterations, in milliseconds.
    #[ortho_config(default = 250)]
    pub poll_interval_ms: u64,
    /// Per-kind drain deadline in seconds. Unbounded when absent.
    pub drain_timeout_secs: Option<u64>,
    /// Stop draining Secrets and Services once a single record remains,
    /// whether or not it is protected.
    #[ortho_config(default = false)]
    pub threshold_termination: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespace: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            delete_concurrency: DEFAULT_DELETE_CONCURRENCY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            drain_timeout_secs: None,
            threshold_termination: false,
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn invalid(&self, problem: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "{} {problem}: set {} or add {} to kube-janitor.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const KUBECONFIG_FIELD: FieldMetadata =
    FieldMetadata::new("kubeconfig path", "KUBE_JANITOR_KUBECONFIG", "kubeconfig");
const NAMESPACE_FIELD: FieldMetadata =
    FieldMetadata::new("namespace", "KUBE_JANITOR_NAMESPACE", "namespace");
const PROBE_TIMEOUT_FIELD: FieldMetadata = FieldMetadata::new(
    "probe timeout",
    "KUBE_JANITOR_PROBE_TIMEOUT_MS",
    "probe_timeout_ms",
);
const CONCURRENCY_FIELD: FieldMetadata = FieldMetadata::new(
    "delete concurrency",
    "KUBE_JANITOR_DELETE_CONCURRENCY",
    "delete_concurrency",
);
const DRAIN_TIMEOUT_FIELD: FieldMetadata = FieldMetadata::new(
    "drain timeout",
    "KUBE_JANITOR_DRAIN_TIMEOUT_SECS",
    "drain_timeout_secs",
);

impl JanitorConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("kube-janitor")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply the offending value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is blank or out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .kubeconfig
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            return Err(KUBECONFIG_FIELD.invalid("must not be blank"));
        }
        if self
            .namespace
            .as_deref()
            .is_some_and(|namespace| namespace.trim().is_empty())
        {
            return Err(NAMESPACE_FIELD.invalid("must not be blank"));
        }
        let max_probe_ms = u64::try_from(MAX_PROBE_TIMEOUT.as_millis()).unwrap_or(u64::MAX);
        if self.probe_timeout_ms == 0 || self.probe_timeout_ms > max_probe_ms {
            return Err(PROBE_TIMEOUT_FIELD.invalid(&format!(
                "must be between 1 and {max_probe_ms} milliseconds"
            )));
        }
        if self.delete_concurrency == 0 {
            return Err(CONCURRENCY_FIELD.invalid("must be at least 1"));
        }
        if self.drain_timeout_secs == Some(0) {
            return Err(DRAIN_TIMEOUT_FIELD.invalid("must be at least 1 second"));
        }
        Ok(())
    }

    /// Returns the kubeconfig path with a leading `~/` expanded.
    #[must_use]
    pub fn kubeconfig_path(&self) -> Option<Utf8PathBuf> {
        self.kubeconfig
            .as_deref()
            .map(|path| Utf8PathBuf::from(expand_tilde(path.trim())))
    }

    /// Returns the reachability probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Builds drain settings from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when validation fails.
    pub fn drain_settings(&self) -> Result<DrainSettings, ConfigError> {
        self.validate()?;
        let termination = if self.threshold_termination {
            Termination::Threshold
        } else {
            Termination::ProtectedAware
        };
        Ok(DrainSettings {
            concurrency: self.delete_concurrency,
            termination,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self.drain_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Expands a leading `~/` prefix to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

/// Errors raised during configuration loading, validation and resolution.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configuration value is blank or out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// No usable connection context could be built from the given kubeconfig
    /// or the defaults.
    #[error("no usable cluster configuration: {0}")]
    Unavailable(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
