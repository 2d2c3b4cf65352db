//! Live-instance accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
}

/// Counts every [`Tracked`] value created and dropped through it.
///
/// Clones of a `Census` share the same counters.
#[derive(Clone, Default)]
pub struct Census(Arc<Counters>);

impl Census {
    pub fn new() -> Census {
        Census::default()
    }

    /// Number of tracked values currently alive.
    pub fn live(&self) -> usize {
        self.created() - self.dropped()
    }

    /// Number of tracked values ever created, clones included.
    pub fn created(&self) -> usize {
        self.0.created.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> usize {
        self.0.dropped.load(Ordering::Acquire)
    }

    /// Creates a tracked value.
    pub fn track(&self, value: u64) -> Tracked {
        self.0.created.fetch_add(1, Ordering::AcqRel);
        Tracked {
            value,
            census: self.clone(),
        }
    }

    /// Creates `count` tracked values `0..count`.
    pub fn track_many(&self, count: usize) -> Vec<Tracked> {
        (0..count as u64).map(|i| self.track(i)).collect()
    }
}

impl std::fmt::Debug for Census {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Census")
            .field("created", &self.created())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// A value registered with a [`Census`] for its whole lifetime.
pub struct Tracked {
    pub value: u64,
    census: Census,
}

slotmem::slot_element!(Tracked);

impl Tracked {
    pub fn census(&self) -> &Census {
        &self.census
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.census.track(self.value)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.census.0.dropped.fetch_add(1, Ordering::AcqRel);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::fmt::Debug for Tracked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Tracked").field(&self.value).finish()
    }
}
