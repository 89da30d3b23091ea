//! Resource kinds managed by the janitor.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, ReplicationController, Secret, Service};
use kube::core::ApiResource;

/// Categories of cluster resources the janitor knows how to drain.
///
/// The natural key of a live resource is `(kind, name)`; names never collide
/// across kinds.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResourceKind {
    /// Core `v1/Pod`.
    Pod,
    /// Core `v1/ReplicationController`.
    ReplicationController,
    /// Core `v1/Secret`.
    Secret,
    /// Core `v1/Service`.
    Service,
    /// `apps/v1/Deployment`.
    Deployment,
}

impl ResourceKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Pod,
        Self::ReplicationController,
        Self::Secret,
        Self::Service,
        Self::Deployment,
    ];

    /// Returns the API kind name (for example `ReplicationController`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::ReplicationController => "ReplicationController",
            Self::Secret => "Secret",
            Self::Service => "Service",
            Self::Deployment => "Deployment",
        }
    }

    /// Returns the `kube` API resource descriptor for this kind.
    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        match self {
            Self::Pod => ApiResource::erase::<Pod>(&()),
            Self::ReplicationController => ApiResource::erase::<ReplicationController>(&()),
            Self::Secret => ApiResource::erase::<Secret>(&()),
            Self::Service => ApiResource::erase::<Service>(&()),
            Self::Deployment => ApiResource::erase::<Deployment>(&()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
