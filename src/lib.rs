//! Convergent cleanup of Kubernetes test clusters.
//!
//! The crate drains pods, replication controllers, secrets, services and
//! deployments from a namespace until only protected records remain. A
//! drain lists a kind, re-fetches and deletes every unprotected record, and
//! re-lists until the kind's loop rule holds, treating records that vanish
//! mid-drain as already converged. The [`Janitor`] sequences drains behind a
//! cheap TCP reachability probe so test suites can call it unconditionally.

pub mod cluster;
pub mod config;
pub mod context;
pub mod drain;
pub mod handle;
pub mod janitor;
pub mod kind;
pub mod policy;
pub mod probe;
pub mod record;
pub mod test_support;

pub use cluster::{ClusterApi, ClusterError, KubeClusterApi, Lookup};
pub use config::{ConfigError, JanitorConfig};
pub use context::{ConnectionContext, resolve_connection_context};
pub use drain::{DrainError, DrainReconciler, DrainReport, DrainSettings};
pub use handle::{HandleFactory, ResourceHandle};
pub use janitor::{CLEANUP_ORDER, CleanupOutcome, CleanupSummary, Janitor, JanitorError};
pub use kind::ResourceKind;
pub use policy::{DrainPolicy, Protection, Termination};
pub use probe::{ReachabilityProbe, TcpProbe};
pub use record::{ObjectRecord, RecordError};
