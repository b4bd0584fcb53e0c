use std::sync::{Arc, RwLock};

use crate::models::Snapshot;

/// Owned cell holding the latest published [`Snapshot`].
///
/// The cycle publishes by swapping in a new `Arc` wholesale; readers clone
/// the current `Arc` and can never observe a half-written snapshot or a mix
/// of two cycles. Starts out holding an empty snapshot so presentation
/// surfaces always have something to render.
#[derive(Clone)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(Snapshot::empty()))),
        }
    }

    /// Atomically replace the published snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut guard = self.inner.write().expect("snapshot lock poisoned");
        *guard = Arc::new(snapshot);
    }

    /// Cheap read of the current snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        self.inner.read().expect("snapshot lock poisoned").clone()
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceResult;

    #[test]
    fn test_starts_empty() {
        let cell = SnapshotCell::new();
        assert!(cell.load().results.is_empty());
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let cell = SnapshotCell::new();
        let before = cell.load();

        cell.publish(Snapshot::new(vec![SourceResult::ok("Feed", vec![])]));

        let after = cell.load();
        assert_eq!(after.results.len(), 1);
        // The reader holding the old Arc still sees the old snapshot.
        assert!(before.results.is_empty());
    }
}
