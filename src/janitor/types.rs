//! Result types reported by the janitor.

use crate::drain::DrainReport;
use crate::kind::ResourceKind;

/// Result of a gated cleanup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CleanupOutcome {
    /// The API host refused the reachability probe; nothing was contacted.
    Skipped {
        /// Host that was probed.
        api_host: String,
    },
    /// Every requested kind was drained.
    Completed(CleanupSummary),
}

impl CleanupOutcome {
    /// Returns the summary of a completed cleanup.
    #[must_use]
    pub const fn summary(&self) -> Option<&CleanupSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Skipped { .. } => None,
        }
    }

    /// Returns `true` when the cleanup was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Per-kind drain reports, in execution order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CleanupSummary {
    /// One report per drained kind.
    pub reports: Vec<DrainReport>,
}

impl CleanupSummary {
    /// Total deletes accepted across every kind.
    #[must_use]
    pub fn total_deleted(&self) -> usize {
        self.reports.iter().map(|report| report.deleted).sum()
    }

    /// Report for `kind`, if it was drained.
    #[must_use]
    pub fn report(&self, kind: ResourceKind) -> Option<&DrainReport> {
        self.reports.iter().find(|report| report.kind == kind)
    }

    /// Kinds drained, in execution order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.reports.iter().map(|report| report.kind).collect()
    }
}
