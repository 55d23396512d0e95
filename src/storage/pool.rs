//! Fixed-capacity connection pool
//!
//! Connections are opened up front and handed out one caller at a time. A
//! semaphore sized to the pool capacity makes callers wait while every
//! connection is checked out; the [`PooledConnection`] guard puts the
//! connection back when it is dropped, whichever way the caller exits.

use crate::storage::traits::{StorageError, StorageResult};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{Semaphore, SemaphorePermit};

/// A pool of storage connections
pub struct ConnectionPool<S> {
    idle: Mutex<Vec<S>>,
    permits: Semaphore,
    capacity: usize,
}

impl<S> ConnectionPool<S> {
    /// Builds a pool from already-open connections
    pub fn new(connections: Vec<S>) -> Self {
        let capacity = connections.len();
        Self {
            idle: Mutex::new(connections),
            permits: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Opens `capacity` connections with `connect` and pools them
    ///
    /// Fails on the first connection that cannot be opened.
    pub fn open<F>(capacity: usize, mut connect: F) -> StorageResult<Self>
    where
        F: FnMut() -> StorageResult<S>,
    {
        let connections = (0..capacity)
            .map(|_| connect())
            .collect::<StorageResult<Vec<_>>>()?;
        tracing::info!("Opened connection pool with {} connections", capacity);
        Ok(Self::new(connections))
    }

    /// Checks out a connection, waiting while the pool is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(PooledConnection)` - A guard that returns the connection on drop
    /// * `Err(StorageError::PoolClosed)` - The pool has been closed
    pub async fn acquire(&self) -> StorageResult<PooledConnection<'_, S>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StorageError::PoolClosed)?;

        // A permit guarantees an idle connection unless a guard was leaked
        let conn = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or(StorageError::PoolEmpty)?;

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
            _permit: permit,
        })
    }

    /// Closes the pool: pending and future `acquire` calls fail with
    /// `PoolClosed`. Connections already checked out stay usable until
    /// their guards drop.
    pub fn close(&self) {
        self.permits.close();
        tracing::debug!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connections not currently checked out
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, conn: S) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

/// A checked-out connection; returned to its pool on drop
pub struct PooledConnection<'a, S> {
    pool: &'a ConnectionPool<S>,
    conn: Option<S>,
    // Declared last so the permit is released after the connection is back
    _permit: SemaphorePermit<'a>,
}

impl<S> Deref for PooledConnection<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<S> DerefMut for PooledConnection<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<S> Drop for PooledConnection<'_, S> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
