//! Unit-test fixtures: a live-instance counter with injectable clone faults.
//!
//! `slotmem-testkit` depends on this crate, so unit tests cannot use its
//! fixtures; integration tests under `tests/` do.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

#[derive(Default)]
struct CensusState {
    live: Cell<usize>,
    clones: Cell<usize>,
    fail_at: Cell<Option<usize>>,
}

#[derive(Clone, Default)]
pub struct Census(Rc<CensusState>);

impl Census {
    pub fn new() -> Census {
        Census::default()
    }

    /// Makes the clone with zero-based index `k` (counted from now) fail.
    pub fn fail_clone_at(&self, k: usize) {
        self.0.clones.set(0);
        self.0.fail_at.set(Some(k));
    }

    pub fn live(&self) -> usize {
        self.0.live.get()
    }

    fn admit_clone(&self) -> Result<(), Fault> {
        let index = self.0.clones.get();
        self.0.clones.set(index + 1);
        if self.0.fail_at.get() == Some(index) {
            return Err(Fault);
        }
        Ok(())
    }
}

pub struct Counted {
    pub value: u32,
    census: Census,
}

crate::slot_element!(Counted);

impl Counted {
    pub fn new(census: &Census, value: u32) -> Counted {
        census.0.live.set(census.live() + 1);
        Counted {
            value,
            census: census.clone(),
        }
    }

    pub fn try_clone(&self) -> Result<Counted, Fault> {
        self.census.admit_clone()?;
        Ok(Counted::new(&self.census, self.value))
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(c) => c,
            Err(Fault) => panic!("injected clone fault"),
        }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.census.0.live.set(self.census.live() - 1);
    }
}
