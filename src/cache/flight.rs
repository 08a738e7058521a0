//! Per-key in-flight slots for coalescing concurrent cache misses.
//!
//! The first caller for a key runs its work inside the slot; callers that arrive while it is
//! running await the same slot and receive a clone of its output, whether or not the cache
//! itself is reachable. A slot is removed as soon as its output is published, so the next
//! miss starts a fresh flight.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

pub struct InFlight<T> {
    slots: DashMap<String, Arc<OnceCell<T>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

/// Output of one [`InFlight::run`] call.
#[derive(Debug)]
pub struct Landed<T> {
    pub value: T,
    /// False when the value was produced by another caller's work.
    pub led: bool,
}

impl<T: Clone> InFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key`, or joins the run already in progress.
    ///
    /// If the running caller is cancelled before publishing, one of the waiters runs its own
    /// `work` instead.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Landed<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let release = Release {
            slots: &self.slots,
            key,
            slot,
        };

        let mut led = false;
        let value = release
            .slot
            .get_or_init(|| {
                led = true;
                work()
            })
            .await
            .clone();

        Landed { value, led }
    }

    /// Number of keys with a live slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

struct Release<'a, T> {
    slots: &'a DashMap<String, Arc<OnceCell<T>>>,
    key: &'a str,
    slot: Arc<OnceCell<T>>,
}

impl<T> Drop for Release<'_, T> {
    fn drop(&mut self) {
        // Published slots go at once. An empty slot goes when only the map and this caller hold it.
        self.slots.remove_if(self.key, |_, slot| {
            Arc::ptr_eq(slot, &self.slot)
                && (slot.initialized() || Arc::strong_count(slot) <= 2)
        });
    }
}
