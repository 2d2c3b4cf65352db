//! Element types whose copy construction fails on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::census::{Census, Tracked};

const NEVER: usize = usize::MAX;

/// The error produced by a planned construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("injected fault at construction {index}")]
pub struct InjectedFault {
    pub index: usize,
}

struct PlanState {
    constructions: AtomicUsize,
    fail_at: AtomicUsize,
}

/// Decides which copy construction of a [`Faulty`] value fails.
///
/// Constructions are numbered from zero in the order they are attempted,
/// across every value sharing the plan.
#[derive(Clone)]
pub struct FaultPlan(Arc<PlanState>);

impl FaultPlan {
    /// A plan under which every construction succeeds.
    pub fn never() -> FaultPlan {
        FaultPlan(Arc::new(PlanState {
            constructions: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(NEVER),
        }))
    }

    /// A plan under which construction `index` fails.
    pub fn fail_at(index: usize) -> FaultPlan {
        let plan = FaultPlan::never();
        plan.rearm(index);
        plan
    }

    /// Restarts the numbering and makes construction `index` fail.
    pub fn rearm(&self, index: usize) {
        self.0.constructions.store(0, Ordering::Release);
        self.0.fail_at.store(index, Ordering::Release);
    }

    /// Restarts the numbering; no construction fails.
    pub fn disarm(&self) {
        self.rearm(NEVER);
    }

    /// Number of constructions attempted since the plan was last armed.
    pub fn constructions(&self) -> usize {
        self.0.constructions.load(Ordering::Acquire)
    }

    fn admit(&self) -> Result<(), InjectedFault> {
        let index = self.0.constructions.fetch_add(1, Ordering::AcqRel);
        if index == self.0.fail_at.load(Ordering::Acquire) {
            return Err(InjectedFault { index });
        }
        Ok(())
    }
}

impl Default for FaultPlan {
    fn default() -> Self {
        FaultPlan::never()
    }
}

/// A tracked value whose copies consult a [`FaultPlan`].
///
/// [`try_clone`](Faulty::try_clone) reports the planned failure as an
/// [`InjectedFault`]; `Clone::clone` panics with it instead.
pub struct Faulty {
    inner: Tracked,
    plan: FaultPlan,
}

slotmem::slot_element!(Faulty);

impl Faulty {
    pub fn new(census: &Census, plan: &FaultPlan, value: u64) -> Faulty {
        Faulty {
            inner: census.track(value),
            plan: plan.clone(),
        }
    }

    pub fn value(&self) -> u64 {
        self.inner.value
    }

    pub fn try_clone(&self) -> Result<Faulty, InjectedFault> {
        self.plan.admit()?;
        Ok(Faulty {
            inner: self.inner.clone(),
            plan: self.plan.clone(),
        })
    }
}

impl Clone for Faulty {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(value) => value,
            Err(fault) => panic!("{fault}"),
        }
    }
}

impl std::fmt::Debug for Faulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Faulty").field(&self.value()).finish()
    }
}
