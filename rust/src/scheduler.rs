//! Two execution contexts.
//!
//! * [`BackgroundQueue`]: one worker thread running jobs strictly FIFO, so two
//!   pipeline runs never interleave their fetch/decrypt work.
//! * [`ForegroundQueue`]: one actor thread owning all dialog state; the only
//!   place the host's dialog widget is touched.
//!
//! Both are plain `flume` channels drained by a dedicated thread. The only
//! suspension points are the hand-offs into these queues. A panicking job or
//! message is logged and the thread moves on to the next one.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use flume::Sender;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub(crate) struct BackgroundQueue {
    tx: Sender<Job>,
}

impl BackgroundQueue {
    pub(crate) fn start(name: &str) -> Self {
        let (tx, rx) = flume::unbounded::<Job>();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            while let Ok(job) = rx.recv() {
                // A panicking collaborator must not take the worker down with it.
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("background job panicked");
                }
            }
        });
        if let Err(e) = spawned {
            tracing::error!(%e, "failed to spawn background worker");
        }
        Self { tx }
    }

    /// Enqueue behind everything already submitted. Never blocks the caller.
    pub(crate) fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }
}

/// Sender half of the foreground actor plus the identity of its thread.
pub(crate) struct ForegroundQueue<M> {
    tx: Sender<M>,
    thread: Arc<OnceLock<ThreadId>>,
}

impl<M> Clone for ForegroundQueue<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            thread: self.thread.clone(),
        }
    }
}

impl<M: Send + 'static> ForegroundQueue<M> {
    /// Spawns the actor thread. `make_actor` runs on that thread and receives a
    /// handle back to this queue; `handle` is invoked once per message, in order.
    pub(crate) fn start<A, F, H>(name: &str, make_actor: F, mut handle: H) -> Self
    where
        F: FnOnce(ForegroundQueue<M>) -> A + Send + 'static,
        H: FnMut(&mut A, M) + Send + 'static,
    {
        let (tx, rx) = flume::unbounded::<M>();
        let queue = Self {
            tx,
            thread: Arc::new(OnceLock::new()),
        };
        let for_actor = queue.clone();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let _ = for_actor.thread.set(thread::current().id());
            let mut actor = make_actor(for_actor);
            while let Ok(msg) = rx.recv() {
                if catch_unwind(AssertUnwindSafe(|| handle(&mut actor, msg))).is_err() {
                    tracing::error!("foreground message handler panicked");
                }
            }
        });
        if let Err(e) = spawned {
            tracing::error!(%e, "failed to spawn foreground actor");
        }
        queue
    }

    pub(crate) fn post(&self, msg: M) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub(crate) fn is_current(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }
}
