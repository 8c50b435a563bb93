//! Per-inspection single-flight locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::InspectionId;

type LockMap = HashMap<InspectionId, Arc<AsyncMutex<()>>>;

/// One async mutex per inspection, created on first use and dropped again
/// once nobody holds or waits for it.
#[derive(Debug, Default)]
pub struct InspectionLocks {
    inner: Mutex<LockMap>,
}

/// Exclusive hold on one inspection; releasing it may retire the map entry.
#[derive(Debug)]
pub struct InspectionLockGuard<'a> {
    locks: &'a InspectionLocks,
    inspection_id: InspectionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InspectionLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.inspection_id);
    }
}

impl InspectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no other pass holds `inspection_id`, then hold it until the
    /// guard drops.
    pub async fn acquire(&self, inspection_id: InspectionId) -> InspectionLockGuard<'_> {
        let lock = Arc::clone(self.map().entry(inspection_id).or_default());
        let guard = lock.lock_owned().await;
        InspectionLockGuard {
            locks: self,
            inspection_id,
            guard: Some(guard),
        }
    }

    /// Forget the entry when the map holds the only reference. Holders and
    /// waiters each keep a clone, and new clones are only taken under the map
    /// lock, so the count cannot grow while it is checked.
    fn release(&self, inspection_id: InspectionId) {
        let mut locks = self.map();
        if locks
            .get(&inspection_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&inspection_id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.map().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_inspection_is_exclusive() {
        let locks = InspectionLocks::new();
        let id = InspectionId::new(1);

        let guard = locks.acquire(id).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(id)).await;
        assert!(second.is_err());

        drop(guard);
        let _reacquired = locks.acquire(id).await;
    }

    #[tokio::test]
    async fn different_inspections_do_not_block() {
        let locks = InspectionLocks::new();
        let _first = locks.acquire(InspectionId::new(1)).await;
        let _second = locks.acquire(InspectionId::new(2)).await;
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let locks = InspectionLocks::new();
        for id in 1..=50 {
            let _guard = locks.acquire(InspectionId::new(id)).await;
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_is_queued() {
        let locks = InspectionLocks::new();
        let id = InspectionId::new(7);

        let first = locks.acquire(id).await;
        let (_, second) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(first);
                // The waiter still holds a reference, so the entry stays
                assert_eq!(locks.tracked(), 1);
            },
            locks.acquire(id),
        );

        assert_eq!(locks.tracked(), 1);
        drop(second);
        assert_eq!(locks.tracked(), 0);
    }
}
