//! Deferred, bounded-concurrency job dispatch.

use crate::scope::Scope;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// A unit of deferred work executed by the pool.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A fixed pool of workers draining a bounded job queue.
///
/// Jobs are submitted with a delay; a lightweight deferred arm (not a
/// worker) waits the delay out and then enqueues the job, dropping it
/// instead if the scope cancels first. Each worker executes its jobs
/// serially. Closing the queue lets the workers drain what is left and
/// exit.
pub struct Executor {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    scope: Scope,
}

impl Executor {
    /// Starts `workers` workers sharing a queue of capacity `16 * workers`.
    pub fn new(workers: usize, scope: Scope) -> Arc<Self> {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(16 * workers);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        for index in 0..workers {
            tokio::spawn(worker(index, rx.clone()));
        }
        Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            scope,
        })
    }

    /// Schedules `job` to be placed on the queue after `delay`. The job is
    /// dropped if the scope cancels before the delay elapses, or if the
    /// executor has already been closed.
    pub fn submit(&self, delay: Duration, job: Job) {
        let sender = self.tx.lock().expect("executor queue poisoned").clone();
        let Some(sender) = sender else { return };
        let scope = self.scope.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = scope.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = sender.send(job).await;
                }
            }
        });
    }

    /// Closes the queue. Pending jobs are still drained; workers exit once
    /// the queue is empty and every deferred arm has resolved.
    pub fn close(&self) {
        self.tx.lock().expect("executor queue poisoned").take();
    }
}

async fn worker(index: usize, queue: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = { queue.lock().await.recv().await };
        match job {
            Some(job) => job.await,
            None => {
                debug!(worker = index, "executor worker exiting");
                return;
            }
        }
    }
}
