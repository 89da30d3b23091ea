//! Connection context resolution.
//!
//! A [`ConnectionContext`] is resolved once by the caller and threaded through
//! every component by reference; nothing below the orchestrator re-reads
//! kubeconfig files or the environment.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use http::Uri;
use kube::Config;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::{debug, warn};

use crate::config::ConfigError;

/// Resolved endpoint, identity and namespace for one cluster.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct ConnectionContext {
    api_host: String,
    namespace: String,
    config: Config,
}

impl ConnectionContext {
    /// Wraps a `kube` configuration, deriving the API host from its cluster
    /// URL.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            api_host: api_host_of(&config),
            namespace: config.default_namespace.clone(),
            config,
        }
    }

    /// Builds an unauthenticated context for a bare endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `endpoint` is not a valid URI.
    pub fn for_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        let uri = endpoint
            .parse::<Uri>()
            .map_err(|err| ConfigError::Invalid(format!("endpoint {endpoint}: {err}")))?;
        Ok(Self::from_config(Config::new(uri)))
    }

    /// Overrides the namespace requests are scoped to.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let scoped = namespace.into();
        self.config.default_namespace.clone_from(&scoped);
        self.namespace = scoped;
        self
    }

    /// API host in `scheme://host[:port]` form, as consumed by the probe.
    #[must_use]
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Namespace requests are scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Underlying client configuration, including credentials.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

fn api_host_of(config: &Config) -> String {
    let url = &config.cluster_url;
    match (url.scheme_str(), url.authority()) {
        (Some(scheme), Some(authority)) => format!("{scheme}://{authority}"),
        _ => url.to_string(),
    }
}

/// Resolves a connection context from an optional kubeconfig path.
///
/// An explicit path is tried first. When it is absent or unusable the
/// default chain applies: `KUBECONFIG`, `~/.kube/config`, then the in-cluster
/// service account.
///
/// # Errors
///
/// Returns [`ConfigError::Unavailable`] naming every source that failed when
/// none of them yields a usable configuration.
pub async fn resolve_connection_context(
    kubeconfig: Option<&Utf8Path>,
) -> Result<ConnectionContext, ConfigError> {
    let mut failures = Vec::new();
    if let Some(path) = kubeconfig {
        match from_kubeconfig_file(path).await {
            Ok(config) => {
                debug!(path = %path, "resolved cluster configuration from kubeconfig");
                return Ok(ConnectionContext::from_config(config));
            }
            Err(message) => {
                warn!(path = %path, error = %message, "kubeconfig unusable; trying defaults");
                failures.push(format!("{path}: {message}"));
            }
        }
    }

    Config::infer()
        .await
        .map(ConnectionContext::from_config)
        .map_err(|err| {
            failures.push(format!("defaults: {err}"));
            ConfigError::Unavailable(failures.join("; "))
        })
}

async fn from_kubeconfig_file(path: &Utf8Path) -> Result<Config, String> {
    let contents = read_kubeconfig(path)?;
    let mut kubeconfig = Kubeconfig::from_yaml(&contents).map_err(|err| err.to_string())?;
    anchor_relative_paths(&mut kubeconfig, kubeconfig_parent(path));
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|err| err.to_string())
}

fn kubeconfig_parent(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

fn read_kubeconfig(path: &Utf8Path) -> Result<String, String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| String::from("kubeconfig path is missing a filename"))?;
    let dir = Dir::open_ambient_dir(kubeconfig_parent(path), ambient_authority())
        .map_err(|err| err.to_string())?;
    dir.read_to_string(file_name).map_err(|err| err.to_string())
}

/// Resolves relative certificate and key paths against the directory holding
/// the kubeconfig, matching how `kubectl` reads them.
fn anchor_relative_paths(kubeconfig: &mut Kubeconfig, base: &Utf8Path) {
    for named in &mut kubeconfig.clusters {
        if let Some(cluster) = named.cluster.as_mut() {
            anchor(&mut cluster.certificate_authority, base);
        }
    }
    for named in &mut kubeconfig.auth_infos {
        if let Some(auth) = named.auth_info.as_mut() {
            anchor(&mut auth.client_certificate, base);
            anchor(&mut auth.client_key, base);
        }
    }
}

fn anchor(field: &mut Option<String>, base: &Utf8Path) {
    if let Some(path) = field.as_mut()
        && Utf8Path::new(path.as_str()).is_relative()
    {
        *path = base.join(path.as_str()).into_string();
    }
}
