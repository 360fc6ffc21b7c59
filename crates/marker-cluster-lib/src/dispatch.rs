//! Running the apply phase on the thread that owns the map

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A unit of work that must run on the dispatcher's thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes apply-phase work on a designated thread
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: Task);
}

/// Runs every task immediately on the calling thread
///
/// With this dispatcher the apply phase runs on the background worker, which is fine
/// for headless use where nothing else touches the markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Queue drained by the owning thread, typically once per frame
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct MainThreadQueue {
    sender: mpsc::UnboundedSender<Task>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>,
}

impl MainThreadQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Run all queued tasks without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Some(task) = self.next_task() {
            task();
            count += 1;
        }
        count
    }

    /// Block until one task is available and run it
    ///
    /// Must not be called from inside an async runtime.
    pub fn run_next_blocking(&self) {
        let task = {
            let mut receiver = self
                .receiver
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            receiver.blocking_recv()
        };
        // The queue keeps a sender of its own, so the channel never closes
        if let Some(task) = task {
            task();
        }
    }

    fn next_task(&self) -> Option<Task> {
        // The lock is released before the task runs, tasks may enqueue more work
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        receiver.try_recv().ok()
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for MainThreadQueue {
    fn dispatch(&self, task: Task) {
        if self.sender.send(task).is_err() {
            tracing::warn!("Main thread queue is closed, dropping apply task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        InlineDispatcher.dispatch(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_runs_on_drain() {
        let queue = MainThreadQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = counter.clone();
            queue.dispatch(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn test_tasks_may_enqueue_more_work() {
        let queue = MainThreadQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let inner_queue = queue.clone();
        let c = counter.clone();
        queue.dispatch(Box::new(move || {
            let c2 = c.clone();
            inner_queue.dispatch(Box::new(move || {
                c2.fetch_add(1, Ordering::SeqCst);
            }));
        }));
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_next_blocking_from_other_thread() {
        let queue = MainThreadQueue::new();
        let producer = queue.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handle = std::thread::spawn(move || {
            producer.dispatch(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        });
        queue.run_next_blocking();
        handle.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
