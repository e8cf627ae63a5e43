use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fanout_common::{FanoutError, Result};

use crate::endpoint::Endpoint;
use crate::registry::PoolRegistry;

/// An endpoint picked by the [`Selector`], with its position in the pool.
#[derive(Debug)]
pub struct Selected<'a, T> {
    pub index: usize,
    pub endpoint: &'a Endpoint<T>,
}

impl<'a, T> Selected<'a, T> {
    pub fn target(&self) -> &'a T {
        self.endpoint.target()
    }
}

/// Round-robin selector over a [`PoolRegistry`].
///
/// The cursor holds the last-served index and starts at 0. Every attempt first
/// advances it by exactly one position modulo the pool size and then serves the
/// endpoint it lands on, so a fresh pool serves index 1 first (index 0 on a
/// single-entry pool). The cursor moves whether or not that endpoint turns out
/// to be healthy, so repeated calls always sweep the whole pool. It is a single
/// atomic shared by all callers.
#[derive(Debug)]
pub struct Selector<T> {
    registry: Arc<PoolRegistry<T>>,
    cursor: AtomicUsize,
}

impl<T> Selector<T> {
    pub fn new(registry: Arc<PoolRegistry<T>>) -> Self {
        Self {
            registry,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<T>> {
        &self.registry
    }

    /// Index of the endpoint the last attempt landed on.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Moves the cursor one step and returns the position it landed on.
    fn advance(&self) -> usize {
        let len = self.registry.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        (previous + 1) % len
    }

    /// Picks the next endpoint without looking at health.
    ///
    /// Used on the build path, where reachability problems surface later as
    /// transport errors.
    pub fn next(&self) -> Selected<'_, T> {
        let index = self.advance();
        Selected {
            index,
            endpoint: &self.registry.endpoints_slice()[index],
        }
    }

    /// Picks the next healthy endpoint, trying at most once per pool entry.
    ///
    /// # Errors
    /// Returns `FanoutError::NoHealthyTarget` after `len()` attempts when no
    /// endpoint is healthy.
    pub fn next_healthy(&self) -> Result<Selected<'_, T>> {
        let attempts = self.registry.len();
        for _ in 0..attempts {
            let selected = self.next();
            if selected.endpoint.is_healthy() {
                return Ok(selected);
            }
        }

        Err(FanoutError::NoHealthyTarget { attempts })
    }
}
