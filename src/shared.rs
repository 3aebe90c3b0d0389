//! Thread-safe registry handle
//!
//! The registry itself does no locking. `SharedRegistry` puts one mutex
//! around it so each call runs to completion before the next one starts.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::charity::{Charity, NewCharity};
use crate::context::CallContext;
use crate::error::Result;
use crate::event::EventSink;
use crate::identity::Identity;
use crate::registry::{CharityRegistry, RegistryState};

/// A cloneable handle to a single registry
pub struct SharedRegistry<S: EventSink> {
    inner: Arc<Mutex<CharityRegistry<S>>>,
}

impl<S: EventSink> Clone for SharedRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EventSink> SharedRegistry<S> {
    pub fn new(registry: CharityRegistry<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    // Every operation leaves the registry whole, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, CharityRegistry<S>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_charity(&self, ctx: &CallContext, listing: NewCharity) -> u64 {
        self.lock().create_charity(ctx, listing)
    }

    pub fn get_charity(&self, id: u64) -> Charity {
        self.lock().get_charity(id)
    }

    pub fn get_charities(&self) -> Vec<Charity> {
        self.lock().get_charities()
    }

    pub fn get_counter(&self) -> u64 {
        self.lock().get_counter()
    }

    pub fn get_contract_owner(&self) -> Identity {
        self.lock().get_contract_owner()
    }

    pub fn delete_charity(&self, ctx: &CallContext, id: u64) -> Result<()> {
        self.lock().delete_charity(ctx, id)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> RegistryState {
        self.lock().state().clone()
    }

    /// Run several operations under a single lock acquisition
    pub fn with<T>(&self, op: impl FnOnce(&mut CharityRegistry<S>) -> T) -> T {
        let mut guard = self.lock();
        op(&mut *guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MemorySink;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_concurrent_creates_get_unique_ids() {
        let admin = Identity::from_bytes([1; 20]);
        let shared = SharedRegistry::new(CharityRegistry::new(admin, MemorySink::new()));

        let handles: Vec<_> = (0..8u8)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let ctx = CallContext::new(Identity::from_bytes([n + 2; 20]));
                    (0..25)
                        .map(|_| shared.create_charity(&ctx, NewCharity::new("c", "d", 1, 1)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 200);
        assert_eq!(shared.get_counter(), 200);
        assert_eq!(ids, (1..=200).collect());
        assert!(shared.snapshot().is_consistent());
        assert_eq!(shared.with(|r| r.sink().events().len()), 200);
    }

    #[test]
    fn test_only_one_concurrent_delete_succeeds() {
        let admin = Identity::from_bytes([1; 20]);
        let shared = SharedRegistry::new(CharityRegistry::detached(admin));
        let ctx = CallContext::new(admin);
        let id = shared.create_charity(&ctx, NewCharity::new("c", "d", 1, 1));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.delete_charity(&ctx, id).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }
}
