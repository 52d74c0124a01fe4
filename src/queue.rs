//! Work Queue: a joinable FIFO built on a crossbeam channel plus an
//! outstanding-task counter, mirroring Python's `queue.Queue.join()`
//! semantics the design notes call for.
//!
//! Recursion is expressed as `put`-ting children from inside a worker
//! while processing their parent; `join` only returns once every `put`
//! has a matching `task_done`, so in-flight recursive enqueues never
//! cause a spurious early return.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::result::Labels;

/// A file that has not yet been scanned: an absolute path plus its
/// inherited label set.
#[derive(Debug, Clone)]
pub struct Task {
    pub path: std::path::PathBuf,
    pub labels: Labels,
}

struct JoinState {
    outstanding: AtomicU64,
    lock: Mutex<()>,
    cond: Condvar,
}

pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    join_state: std::sync::Arc<JoinState>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            join_state: std::sync::Arc::new(JoinState {
                outstanding: AtomicU64::new(0),
                lock: Mutex::new(()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Enqueue a task. Safe to call concurrently from multiple workers.
    pub fn put(&self, task: Task) {
        self.join_state.outstanding.fetch_add(1, Ordering::SeqCst);
        // The channel is unbounded and only dropped after every worker has
        // exited, so a send error here would indicate a logic bug.
        self.sender.send(task).expect("task queue receiver dropped while a put was in flight");
    }

    /// Blocks until a task is available or the queue is permanently
    /// closed (all senders dropped), returning `None` in the latter case.
    pub fn get(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    /// Non-blocking variant of `get`, for single-threaded drivers that
    /// want to drain exactly what is currently enqueued.
    pub fn try_get(&self) -> Option<Task> {
        self.receiver.try_recv().ok()
    }

    /// Acknowledge completion of one previously-`get`-ed task.
    pub fn task_done(&self) {
        let prev = self.join_state.outstanding.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            let _guard = self.join_state.lock.lock().unwrap();
            self.join_state.cond.notify_all();
        }
    }

    /// Blocks until every `put` has been matched by a `task_done`.
    pub fn join(&self) {
        loop {
            if self.join_state.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            let guard = self.join_state.lock.lock().unwrap();
            if self.join_state.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            let _ = self
                .join_state
                .cond
                .wait_timeout(guard, std::time::Duration::from_millis(50));
        }
    }

    /// A cloneable handle workers use to `get`/`put`/`task_done` without
    /// owning the queue.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            join_state: self.join_state.clone(),
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A cheaply-cloneable reference to a [`TaskQueue`] for worker threads.
#[derive(Clone)]
pub struct QueueHandle {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    join_state: std::sync::Arc<JoinState>,
}

impl QueueHandle {
    pub fn put(&self, task: Task) {
        self.join_state.outstanding.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(task);
    }

    pub fn get(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    pub fn try_get(&self) -> Option<Task> {
        self.receiver.try_recv().ok()
    }

    pub fn task_done(&self) {
        let prev = self.join_state.outstanding.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            let _guard = self.join_state.lock.lock().unwrap();
            self.join_state.cond.notify_all();
        }
    }
}
