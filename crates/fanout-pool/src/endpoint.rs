use std::sync::atomic::{AtomicBool, Ordering};

/// One pool entry: an immutable target plus its liveness state.
///
/// The health flag is the only mutable field. Each endpoint carries its own
/// atomics, so updating one never contends with reads of another.
#[derive(Debug)]
pub struct Endpoint<T> {
    target: T,
    healthy: AtomicBool,
    probing: AtomicBool,
}

impl<T> Endpoint<T> {
    /// Creates a healthy endpoint.
    pub fn new(target: T) -> Self {
        Self {
            target,
            healthy: AtomicBool::new(true),
            probing: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Stores the new health flag and returns the previous one.
    pub fn set_health(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }

    /// Claims the in-flight probe slot. Returns `false` if a probe is already running.
    pub(crate) fn try_begin_probe(&self) -> bool {
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_probe(&self) {
        self.probing.store(false, Ordering::Release);
    }

    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::Acquire)
    }
}
