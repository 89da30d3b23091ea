//! Cheap TCP reachability checks for API endpoints.
//!
//! A probe opens one transport connection and closes it immediately; nothing
//! is sent and no attempt is retried. It gates cleanup so that test suites can
//! call the janitor unconditionally on machines without a live cluster.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Default connect timeout applied by [`TcpProbe`].
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound for a probe timeout.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Future returned by [`ReachabilityProbe::is_reachable`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Answers whether an endpoint currently accepts connections.
pub trait ReachabilityProbe: Send + Sync {
    /// Returns `true` when `endpoint` accepted a connection.
    ///
    /// Parse, connect and timeout failures all yield `false`.
    fn is_reachable<'a>(&'a self, endpoint: &'a str) -> ProbeFuture<'a>;
}

/// Splits `scheme://host[:port]` into a host and port.
///
/// Bracketed IPv6 hosts are returned without their brackets. A numeric port
/// segment wins; otherwise the port is derived from the scheme
/// (`http` is 80, `https` is 443). Returns `None` for unknown schemes without
/// an explicit port, or when the host is empty.
///
/// # Examples
///
/// ```
/// # use kube_janitor::probe::parse_endpoint;
/// assert_eq!(
///     parse_endpoint("https://10.0.0.1:6443"),
///     Some((String::from("10.0.0.1"), 6443))
/// );
/// assert_eq!(
///     parse_endpoint("http://localhost"),
///     Some((String::from("localhost"), 80))
/// );
/// ```
#[must_use]
pub fn parse_endpoint(endpoint: &str) -> Option<(String, u16)> {
    let (scheme, rest) = endpoint.trim().split_once("://")?;
    let authority = rest.split_once('/').map_or(rest, |(authority, _)| authority);
    let (host, port_segment) = split_host_port(authority);
    let explicit_port = port_segment.and_then(|port| port.parse::<u16>().ok());
    if host.is_empty() {
        return None;
    }
    let port = explicit_port.or_else(|| default_port(scheme))?;
    Some((host.to_owned(), port))
}

/// Splits `host[:port]`, unwrapping a bracketed IPv6 literal such as
/// `[::1]:6443`. An unterminated bracket yields an empty host.
fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if let Some(bracketed) = authority.strip_prefix('[') {
        return bracketed
            .split_once(']')
            .map_or(("", None), |(host, rest)| (host, rest.strip_prefix(':')));
    }
    authority
        .split_once(':')
        .map_or((authority, None), |(host, port)| (host, Some(port)))
}

fn default_port(scheme: &str) -> Option<u16> {
    if scheme.eq_ignore_ascii_case("http") {
        Some(80)
    } else if scheme.eq_ignore_ascii_case("https") {
        Some(443)
    } else {
        None
    }
}

/// Probe that attempts a single TCP connect with a fixed timeout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TcpProbe {
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl TcpProbe {
    /// Creates a probe; the timeout is clamped to [`MAX_PROBE_TIMEOUT`].
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            timeout: connect_timeout.min(MAX_PROBE_TIMEOUT),
        }
    }

    /// Returns the connect timeout in use.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, endpoint: &str) -> bool {
        let Some((host, port)) = parse_endpoint(endpoint) else {
            debug!(endpoint, "unparseable endpoint treated as unreachable");
            return false;
        };
        match timeout(self.timeout, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(err)) => {
                debug!(endpoint, error = %err, "endpoint refused connection");
                false
            }
            Err(_) => {
                debug!(endpoint, timeout = ?self.timeout, "endpoint probe timed out");
                false
            }
        }
    }
}

impl ReachabilityProbe for TcpProbe {
    fn is_reachable<'a>(&'a self, endpoint: &'a str) -> ProbeFuture<'a> {
        Box::pin(self.connect(endpoint))
    }
}
