//! Reference-counted probes.

use std::rc::{Rc, Weak};

struct Anchor;

/// A reference-counted element. Every probe of one family shares a single
/// count, observable through its [`ProbeWatch`].
#[derive(Clone)]
pub struct Probe {
    pub tag: u32,
    _anchor: Rc<Anchor>,
}

slotmem::slot_element!(Probe);

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Probe").field(&self.tag).finish()
    }
}

/// Observes the shared count of a probe family without contributing to it.
pub struct ProbeWatch(Weak<Anchor>);

impl ProbeWatch {
    /// Number of probes of the family currently alive.
    pub fn count(&self) -> usize {
        self.0.strong_count()
    }
}

/// Creates `n` probes tagged `0..n` sharing one count.
pub fn probes(n: u32) -> (Vec<Probe>, ProbeWatch) {
    let anchor = Rc::new(Anchor);
    let watch = ProbeWatch(Rc::downgrade(&anchor));
    let probes = (0..n)
        .map(|tag| Probe {
            tag,
            _anchor: anchor.clone(),
        })
        .collect();
    (probes, watch)
}
