//! Shared lifecycle primitives: the cancellation scope and the task group.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

/// Cooperative cancellation handle shared by every task in a simulation.
///
/// Cloning is cheap; all clones observe the same signal. Cancellation is
/// one-way and idempotent.
#[derive(Clone, Debug)]
pub struct Scope {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Scope {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signals cancellation. Returns `true` only for the first caller, which
    /// gates log-once error reporting.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Returns `true` once cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // the sender lives inside self, so wait_for cannot observe a closed
        // channel while this borrow is alive
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by waits that were interrupted by scope cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("simulation scope cancelled")]
pub struct Cancelled;

/// Counts in-flight simulation activities so `Simulation::wait` can detect
/// quiescence. Guards are created when a spawn loop or walk is scheduled and
/// dropped when it ends.
#[derive(Clone, Debug, Default)]
pub struct TaskGroup {
    inner: Arc<GroupInner>,
}

#[derive(Debug, Default)]
struct GroupInner {
    active: AtomicUsize,
    idle: Notify,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one activity; the returned guard deregisters it on drop.
    pub fn enter(&self) -> TaskGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            inner: self.inner.clone(),
        }
    }

    /// Resolves once no activities remain. Resolves immediately when none
    /// were ever registered.
    pub async fn wait(&self) {
        loop {
            let mut idle = std::pin::pin!(self.inner.idle.notified());
            // register interest before checking the count, so a guard
            // dropping in between cannot be missed
            idle.as_mut().enable();
            if self.inner.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Keeps one [`TaskGroup`] activity registered for its lifetime.
#[derive(Debug)]
pub struct TaskGuard {
    inner: Arc<GroupInner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
