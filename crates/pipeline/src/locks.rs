//! Per-story mutual exclusion for driver loops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bedtime_core::types::DbId;
use tokio::sync::OwnedMutexGuard;

/// One async mutex per story id, created on demand.
///
/// Entries are dropped once the last holder or waiter releases them, so the
/// map only holds stories that currently have a driver running.
#[derive(Default)]
pub struct StoryLocks {
    locks: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held while a driver loop owns a story.
pub struct StoryLockGuard<'a> {
    locks: &'a StoryLocks,
    id: DbId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl StoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<DbId, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until no other task holds story `id`, then hold it.
    pub async fn acquire(&self, id: DbId) -> StoryLockGuard<'_> {
        let mutex = Arc::clone(self.map().entry(id).or_default());
        let guard = mutex.lock_owned().await;
        StoryLockGuard {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    /// Number of stories with a live lock entry.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for StoryLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.map();
        if map
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            map.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn entry_is_removed_after_release() {
        let locks = StoryLocks::new();
        {
            let _guard = locks.acquire(1).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn same_story_is_serialized() {
        let locks = Arc::new(StoryLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = locks.acquire(7).await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_stories_do_not_block() {
        let locks = StoryLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
    }
}
