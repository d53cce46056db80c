//! In-memory transactional engine backing the cell stores.
//!
//! `begin()` takes the store's writer lock and clones the table state; all
//! reads and writes inside the transaction act on that working snapshot.
//! `commit()` publishes the snapshot atomically, `rollback()` (or dropping
//! the transaction) discards it. Holding the lock for the whole
//! read-validate-write sequence serializes writers, so two concurrent
//! mutations can never both validate against the same stale state.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

pub struct SnapshotStore<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SnapshotStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Default + 'static> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + 'static> SnapshotStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Open a transaction. Blocks until the current writer (if any) commits
    /// or rolls back.
    pub async fn begin(&self) -> SnapshotTx<T> {
        let guard = self.inner.clone().lock_owned().await;
        let working = guard.clone();
        trace!("transaction opened");
        SnapshotTx { guard, working }
    }

    /// Single-statement read against the committed state, outside any
    /// transaction.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }
}

pub struct SnapshotTx<T: Clone> {
    guard: OwnedMutexGuard<T>,
    working: T,
}

impl<T: Clone> SnapshotTx<T> {
    pub fn rows(&self) -> &T {
        &self.working
    }

    pub fn rows_mut(&mut self) -> &mut T {
        &mut self.working
    }

    /// Publish the working snapshot as the new committed state.
    pub fn commit(self) {
        let SnapshotTx { mut guard, working } = self;
        *guard = working;
        trace!("transaction committed");
    }

    /// Discard the working snapshot. Dropping the transaction has the same
    /// effect; the explicit form marks intent at rejection sites.
    pub fn rollback(self) {
        trace!("transaction rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_publishes_the_snapshot() {
        let store = SnapshotStore::new(vec![1, 2]);

        let mut tx = store.begin().await;
        tx.rows_mut().push(3);
        tx.commit();

        assert_eq!(store.read(|rows| rows.clone()).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = SnapshotStore::new(vec![1]);

        let mut tx = store.begin().await;
        tx.rows_mut().clear();
        tx.rollback();

        assert_eq!(store.read(|rows| rows.len()).await, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_state_untouched() {
        let store = SnapshotStore::new(0u32);

        {
            let mut tx = store.begin().await;
            *tx.rows_mut() = 42;
        }

        assert_eq!(store.read(|n| *n).await, 0);
    }

    #[tokio::test]
    async fn writers_are_serialized() {
        let store = SnapshotStore::new(0u32);

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await;
                *tx.rows_mut() += 1;
                tx.commit();
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await;
                *tx.rows_mut() += 1;
                tx.commit();
            })
        };

        a.await.unwrap();
        b.await.unwrap();

        // With interleaved read-modify-write one increment would be lost.
        assert_eq!(store.read(|n| *n).await, 2);
    }
}
