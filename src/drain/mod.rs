//! Convergent list, filter, delete, re-list loop for one resource kind.
//!
//! Each iteration re-fetches every listed record, skips protected ones and
//! deletes the rest through a bounded pool of concurrent requests. A record
//! that disappears between the listing and its fetch or delete is counted as
//! converged. Every dispatched delete finishes before the next listing, so an
//! iteration boundary is also the only point where the loop can be abandoned.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::cluster::{ClusterApi, ClusterError, Lookup};
use crate::handle::{HandleFactory, ResourceHandle};
use crate::kind::ResourceKind;
use crate::policy::{DrainPolicy, Termination};
use crate::record::RecordError;

/// Default upper bound on deletes in flight.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// Default pause between drain iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Tuning applied to every drain run by a [`DrainReconciler`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DrainSettings {
    /// Maximum number of deletes in flight within one iteration.
    pub concurrency: usize,
    /// Loop rule deciding whether another iteration is needed.
    pub termination: Termination,
    /// Pause before the next iteration when the loop continues.
    pub poll_interval: Duration,
    /// Deadline for a single kind; unbounded when `None`.
    pub timeout: Option<Duration>,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_DELETE_CONCURRENCY,
            termination: Termination::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Errors that abort a drain.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DrainError {
    /// The API rejected or failed a list, fetch or delete.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// A listing entry or fetched record could not be adapted.
    #[error(transparent)]
    Malformed(#[from] RecordError),
    /// The configured deadline passed at an iteration boundary.
    #[error("draining {kind} timed out with {remaining} records remaining")]
    DeadlineExceeded {
        /// Kind being drained.
        kind: ResourceKind,
        /// Length of the last listing.
        remaining: usize,
    },
}

/// Accounting for one completed drain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrainReport {
    /// Kind that was drained.
    pub kind: ResourceKind,
    /// Number of list, delete, re-list passes run.
    pub iterations: usize,
    /// Deletes the API accepted.
    pub deleted: usize,
    /// Records that disappeared before they could be fetched or deleted.
    pub vanished: usize,
    /// Protected records skipped, counted once per iteration.
    pub protected: usize,
    /// Names present in the final listing.
    pub remaining: Vec<String>,
}

impl DrainReport {
    const fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            iterations: 0,
            deleted: 0,
            vanished: 0,
            protected: 0,
            remaining: Vec::new(),
        }
    }

    const fn tally(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Deleted => self.deleted += 1,
            ItemOutcome::Vanished => self.vanished += 1,
            ItemOutcome::Protected => self.protected += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ItemOutcome {
    Deleted,
    Vanished,
    Protected,
}

/// Drains resource kinds against one cluster.
#[derive(Clone, Debug)]
pub struct DrainReconciler<A> {
    factory: HandleFactory,
    api: A,
    settings: DrainSettings,
}

impl<A: ClusterApi> DrainReconciler<A> {
    /// Creates a reconciler issuing requests through `api`.
    #[must_use]
    pub const fn new(factory: HandleFactory, api: A, settings: DrainSettings) -> Self {
        Self {
            factory,
            api,
            settings,
        }
    }

    /// Handle factory bound to the reconciler's context.
    #[must_use]
    pub const fn factory(&self) -> &HandleFactory {
        &self.factory
    }

    /// Deletes every unprotected record of `kind` until the loop rule is
    /// satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`DrainError::Cluster`] on any API failure other than
    /// not-found, [`DrainError::Malformed`] when a record lacks its name, and
    /// [`DrainError::DeadlineExceeded`] when the configured timeout passes.
    /// In-flight deletes complete before an error is returned.
    pub async fn drain(&self, kind: ResourceKind) -> Result<DrainReport, DrainError> {
        let policy = DrainPolicy::for_kind(kind);
        let deadline = self.settings.timeout.map(|limit| Instant::now() + limit);
        let mut report = DrainReport::new(kind);
        let mut listing = self.factory.list(&self.api, kind).await?;

        while policy.should_continue(self.settings.termination, &listing) {
            if let Some(limit) = deadline
                && Instant::now() >= limit
            {
                return Err(DrainError::DeadlineExceeded {
                    kind,
                    remaining: listing.len(),
                });
            }
            report.iterations += 1;
            debug!(%kind, iteration = report.iterations, listed = listing.len(), "drain iteration");

            let outcomes: Vec<Result<ItemOutcome, DrainError>> = stream::iter(
                listing
                    .iter()
                    .map(|record| self.factory.create_handle(kind, record.name())),
            )
            .map(|handle| self.reap(policy, handle))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;
            for outcome in outcomes {
                report.tally(outcome?);
            }

            listing = self.factory.list(&self.api, kind).await?;
            if !self.settings.poll_interval.is_zero()
                && policy.should_continue(self.settings.termination, &listing)
            {
                sleep(self.settings.poll_interval).await;
            }
        }

        report.remaining = listing.iter().map(|record| record.name().to_owned()).collect();
        info!(
            %kind,
            iterations = report.iterations,
            deleted = report.deleted,
            vanished = report.vanished,
            remaining = report.remaining.len(),
            "drain converged"
        );
        Ok(report)
    }

    async fn reap(
        &self,
        policy: DrainPolicy,
        handle: ResourceHandle,
    ) -> Result<ItemOutcome, DrainError> {
        let kind = handle.kind();
        let name = handle.name().to_owned();
        let Lookup::Found(fresh) = handle.fetch(&self.api).await? else {
            debug!(%kind, name = %name, "record vanished before fetch");
            return Ok(ItemOutcome::Vanished);
        };
        if fresh
            .record()
            .is_some_and(|record| policy.is_protected(record))
        {
            debug!(%kind, name = %name, "protected record kept");
            return Ok(ItemOutcome::Protected);
        }
        if fresh.delete(&self.api).await?.is_not_found() {
            debug!(%kind, name = %name, "record vanished before delete");
            return Ok(ItemOutcome::Vanished);
        }
        debug!(%kind, name = %name, "record deleted");
        Ok(ItemOutcome::Deleted)
    }
}
