use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CycleStatus, Snapshot, SourceResult};
use crate::snapshot::SnapshotCell;
use crate::status::StatusPublisher;
use crate::traits::{Extractor, Fetcher, SourceStore};

/// Events emitted while a cycle runs, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CycleEvent<'a> {
    CycleStarted {
        sources: usize,
    },
    SourceUpdated {
        name: &'a str,
        url: &'a str,
        items: usize,
    },
    SourceFailed {
        name: &'a str,
        error: &'a str,
    },
    CycleFinished {
        status: CycleStatus,
        items: usize,
    },
    CycleAborted {
        error: &'a str,
    },
}

/// Trait for receiving cycle events (decoupled logging).
pub trait CycleReporter: Send + Sync {
    fn report(&self, event: CycleEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCycleReporter;

impl CycleReporter for TracingCycleReporter {
    fn report(&self, event: CycleEvent<'_>) {
        match event {
            CycleEvent::CycleStarted { sources } => {
                tracing::info!(%sources, "Update cycle started");
            }
            CycleEvent::SourceUpdated { name, url, items } => {
                tracing::info!(%name, %url, %items, "Source updated");
            }
            CycleEvent::SourceFailed { name, error } => {
                tracing::warn!(%name, %error, "Source failed, skipping");
            }
            CycleEvent::CycleFinished { status, items } => {
                tracing::info!(?status, %items, "Update cycle finished");
            }
            CycleEvent::CycleAborted { error } => {
                tracing::error!(%error, "Update cycle aborted");
            }
        }
    }
}

/// Orchestrates one full refresh pass: enumerate active sources, fetch and
/// extract each one with per-source failure isolation, publish the
/// aggregated snapshot atomically, and record the final cycle status.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP or a real database.
pub struct UpdateCycle<S, F, E>
where
    S: SourceStore,
    F: Fetcher,
    E: Extractor,
{
    store: S,
    fetcher: F,
    extractor: E,
    snapshot: SnapshotCell,
    status: StatusPublisher,
}

impl<S, F, E> UpdateCycle<S, F, E>
where
    S: SourceStore,
    F: Fetcher,
    E: Extractor,
{
    pub fn new(
        store: S,
        fetcher: F,
        extractor: E,
        snapshot: SnapshotCell,
        status: StatusPublisher,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            snapshot,
            status,
        }
    }

    pub fn snapshot(&self) -> &SnapshotCell {
        &self.snapshot
    }

    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    /// Run one full cycle.
    ///
    /// Per-source errors (store read, fetch, extraction) are recorded as
    /// failed [`SourceResult`]s and never abort the cycle. Only a failure
    /// to enumerate active sources aborts: the error propagates, the
    /// previously published snapshot stays untouched, and the status is
    /// set to `Failed`.
    pub async fn run_cycle<R: CycleReporter>(
        &self,
        reporter: &R,
    ) -> Result<Snapshot, AppError> {
        self.status.set(CycleStatus::Running);

        let ids = match self.store.list_active_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                self.status.set(CycleStatus::Failed { failed_sources: 0 });
                reporter.report(CycleEvent::CycleAborted {
                    error: &e.to_string(),
                });
                return Err(e);
            }
        };

        reporter.report(CycleEvent::CycleStarted {
            sources: ids.len(),
        });

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.process_source(id, reporter).await);
        }

        let snapshot = Snapshot::new(results);
        let failed = snapshot.failed_sources();
        let items = snapshot.total_items();

        // Publish before the status flips so readers reacting to "done"
        // always find the new snapshot in place.
        self.snapshot.publish(snapshot.clone());
        let status = if failed == 0 {
            CycleStatus::Succeeded
        } else {
            CycleStatus::Failed {
                failed_sources: failed,
            }
        };
        self.status.set(status);

        reporter.report(CycleEvent::CycleFinished { status, items });

        Ok(snapshot)
    }

    /// Process a single source: read its definition, fetch its URL, run
    /// its extraction script. Every failure becomes a recorded result.
    async fn process_source<R: CycleReporter>(&self, id: Uuid, reporter: &R) -> SourceResult {
        let source = match self.store.read(id).await {
            Ok(Some(source)) => source,
            Ok(None) => {
                // Row vanished between enumeration and read; the name is
                // unknown, so the id stands in for it.
                let error = AppError::NotFound(format!("source {id}")).to_string();
                reporter.report(CycleEvent::SourceFailed {
                    name: &id.to_string(),
                    error: &error,
                });
                return SourceResult::failed(id.to_string(), error);
            }
            Err(e) => {
                let error = e.to_string();
                reporter.report(CycleEvent::SourceFailed {
                    name: &id.to_string(),
                    error: &error,
                });
                return SourceResult::failed(id.to_string(), error);
            }
        };

        let raw = match self.fetcher.fetch(&source.url).await {
            Ok(raw) => raw,
            Err(e) => {
                let error = e.to_string();
                reporter.report(CycleEvent::SourceFailed {
                    name: &source.name,
                    error: &error,
                });
                return SourceResult::failed(source.name, error);
            }
        };

        match self.extractor.extract(&source.processing, &raw) {
            Ok(items) => {
                reporter.report(CycleEvent::SourceUpdated {
                    name: &source.name,
                    url: &source.url,
                    items: items.len(),
                });
                SourceResult::ok(source.name, items)
            }
            Err(e) => {
                let error = e.to_string();
                reporter.report(CycleEvent::SourceFailed {
                    name: &source.name,
                    error: &error,
                });
                SourceResult::failed(source.name, error)
            }
        }
    }
}
