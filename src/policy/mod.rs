//! Per-kind drain policies.
//!
//! | Kind                  | Protected records                                  | Literal loop rule |
//! |-----------------------|----------------------------------------------------|-------------------|
//! | Pod                   | none                                               | `remaining > 0`   |
//! | ReplicationController | none                                               | `remaining > 0`   |
//! | Secret                | `type` contains `service-account-token`            | `remaining > 1`   |
//! | Service               | labels `component=apiserver`, `provider=kubernetes`| `remaining > 1`   |
//! | Deployment            | none                                               | `remaining > 0`   |

use crate::kind::ResourceKind;
use crate::record::ObjectRecord;

/// Substring identifying secrets issued for service accounts.
pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "service-account-token";

/// Labels carried by the cluster's own control-plane service.
pub const CONTROL_PLANE_SERVICE_LABELS: [(&str, &str); 2] =
    [("component", "apiserver"), ("provider", "kubernetes")];

/// Which records of a kind must survive every drain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protection {
    /// Every record is deletable.
    Nothing,
    /// Secrets whose type names a service-account token.
    ServiceAccountTokens,
    /// The control-plane service.
    ControlPlaneService,
}

/// How a drain decides whether another iteration is needed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Termination {
    /// Continue while the listing still holds an unprotected record.
    #[default]
    ProtectedAware,
    /// Continue while [`DrainPolicy::keep_draining`] holds for the listing
    /// length. For Secrets and Services this assumes exactly one protected
    /// record exists: with none, one deletable record is left behind; with
    /// several, the drain never terminates.
    Threshold,
}

/// Stateless protection predicate and loop rule for one kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DrainPolicy {
    kind: ResourceKind,
    protection: Protection,
    residual: usize,
}

impl DrainPolicy {
    /// Returns the static policy for `kind`.
    #[must_use]
    pub const fn for_kind(kind: ResourceKind) -> Self {
        let (protection, residual) = match kind {
            ResourceKind::Pod | ResourceKind::ReplicationController | ResourceKind::Deployment => {
                (Protection::Nothing, 0)
            }
            ResourceKind::Secret => (Protection::ServiceAccountTokens, 1),
            ResourceKind::Service => (Protection::ControlPlaneService, 1),
        };
        Self {
            kind,
            protection,
            residual,
        }
    }

    /// Kind this policy governs.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Protection rule applied to this kind.
    #[must_use]
    pub const fn protection(&self) -> Protection {
        self.protection
    }

    /// Returns `true` when `record` must never be deleted.
    #[must_use]
    pub fn is_protected(&self, record: &ObjectRecord) -> bool {
        match self.protection {
            Protection::Nothing => false,
            Protection::ServiceAccountTokens => record
                .secret_type()
                .is_some_and(|secret_type| secret_type.contains(SERVICE_ACCOUNT_TOKEN_TYPE)),
            Protection::ControlPlaneService => CONTROL_PLANE_SERVICE_LABELS
                .iter()
                .all(|(key, value)| record.label(key) == Some(*value)),
        }
    }

    /// Literal loop rule: keep draining while more than the expected number
    /// of permanent records remain.
    #[must_use]
    pub const fn keep_draining(&self, remaining_count: usize) -> bool {
        remaining_count > self.residual
    }

    /// Decides whether `listing` warrants another drain iteration.
    #[must_use]
    pub fn should_continue(&self, termination: Termination, listing: &[ObjectRecord]) -> bool {
        match termination {
            Termination::Threshold => self.keep_draining(listing.len()),
            Termination::ProtectedAware => listing.iter().any(|record| !self.is_protected(record)),
        }
    }
}
