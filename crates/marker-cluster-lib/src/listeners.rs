//! Per-engine listener registries

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Returned on registration, pass it back to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

pub(crate) type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct Listeners<T: ?Sized> {
    entries: Vec<(ListenerHandle, Callback<T>)>,
}

impl<T: ?Sized> Listeners<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: Callback<T>) -> ListenerHandle {
        let handle = ListenerHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        self.entries.push((handle, callback));
        handle
    }

    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(h, _)| *h != handle);
        self.entries.len() != before
    }

    /// Copy of the callbacks, so they can run without holding the registry lock
    pub fn snapshot(&self) -> Vec<Callback<T>> {
        self.entries.iter().map(|(_, cb)| cb.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_add_remove() {
        let mut listeners: Listeners<usize> = Listeners::new();
        let total = Arc::new(AtomicUsize::new(0));
        let t = total.clone();
        let first = listeners.add(Arc::new(move |v: &usize| {
            t.fetch_add(*v, Ordering::SeqCst);
        }));
        let t = total.clone();
        let second = listeners.add(Arc::new(move |v: &usize| {
            t.fetch_add(*v * 10, Ordering::SeqCst);
        }));
        assert_ne!(first, second);

        for callback in listeners.snapshot() {
            callback(&1);
        }
        assert_eq!(total.load(Ordering::SeqCst), 11);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        assert_eq!(listeners.snapshot().len(), 1);
        for callback in listeners.snapshot() {
            callback(&1);
        }
        assert_eq!(total.load(Ordering::SeqCst), 21);
    }
}
