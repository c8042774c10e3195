use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = HashMap<Uuid, Arc<AsyncMutex<()>>>;

/// One async mutex per trip. Every operation that reads and then writes a
/// trip's seat inventory or its active seat set holds the trip's guard
/// for the whole read-check-write sequence, so operations on the same trip
/// run one at a time while different trips proceed in parallel.
///
/// Entries only live while someone holds or waits on them: releasing the
/// last guard for a trip removes its entry.
#[derive(Default)]
pub struct TripLocks {
    locks: Mutex<LockMap>,
}

/// Held lock on one trip. Dropping it releases the trip and evicts the
/// entry when no other task holds a handle to it.
pub struct TripGuard<'a> {
    locks: &'a TripLocks,
    trip_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TripLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, trip_id: Uuid) -> TripGuard<'_> {
        let lock = self.map().entry(trip_id).or_default().clone();
        let guard = lock.lock_owned().await;
        TripGuard { locks: self, trip_id, guard: Some(guard) }
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Handles are only cloned under the map lock, so a count of one here
    // means nobody else holds or is about to wait on this mutex.
    fn release(&self, trip_id: Uuid) {
        let mut locks = self.map();
        if locks.get(&trip_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&trip_id);
        }
    }
}

impl Drop for TripGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.trip_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_trip_is_serialized() {
        let locks = Arc::new(TripLocks::new());
        let trip = Uuid::new_v4();

        let guard = locks.lock(trip).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(trip).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_trips_do_not_block() {
        let locks = TripLocks::new();
        let _a = locks.lock(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4())).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_release_evicts_idle_entries() {
        let locks = TripLocks::new();
        for _ in 0..500 {
            drop(locks.lock(Uuid::new_v4()).await);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiter_queued() {
        let locks = Arc::new(TripLocks::new());
        let trip = Uuid::new_v4();

        let first = locks.lock(trip).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(trip).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        // The queued task still holds the handle, so the entry stays.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
