//! Per-user serialization of inbound events.
//!
//! Each user maps to an async mutex held for the whole handling of one
//! event. Entries are dropped as soon as nobody holds or waits on them, so
//! the map only grows with the number of users active right now.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn acquire(&self, user_id: i64) -> UserGuard {
        // Clone the Arc out so no DashMap guard is held across the await.
        let mutex = self.inner.entry(user_id).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        UserGuard {
            locks: self.clone(),
            user_id,
            guard: Some(guard),
        }
    }

    /// Number of users with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Exclusive access to one user; released on drop.
pub struct UserGuard {
    locks: UserLocks,
    user_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts.
        self.guard.take();
        self.locks
            .inner
            .remove_if(&self.user_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
