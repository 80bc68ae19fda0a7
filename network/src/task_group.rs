//! Counter-based join barrier for self-spawning work.
//!
//! A broadcast fans out into a tree of short-lived tasks whose shape is only
//! known while it runs: every task may spawn more. [`TaskGroup`] tracks the
//! number of outstanding tasks and releases [`TaskGroup::wait_until_zero`]
//! once the last one finishes.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Outstanding-task count with a wakeup for when it returns to zero.
#[derive(Default)]
pub struct TaskGroup {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl TaskGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `task` on the tokio runtime as a member of this group.
    ///
    /// The counter is incremented before the task is handed to the runtime,
    /// so a parent that spawns children before returning keeps the group
    /// non-empty throughout.
    pub fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let guard = Outstanding(Arc::clone(self));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks spawned and not yet finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Resolve once no task of the group is outstanding.
    ///
    /// Returns immediately if nothing was ever spawned.
    pub async fn wait_until_zero(&self) {
        loop {
            let idle = self.idle.notified();
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Decrements the group when the task ends, including by panic.
struct Outstanding(Arc<TaskGroup>);

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}
