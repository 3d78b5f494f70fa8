//! Choosing one address out of a multi-record answer.
//!
//! Picking at random means an attacker who controls only some of the
//! records cannot predict which one the guard checks and pins.

use rand::Rng;

/// Picks an index in `0..len`. Callers never pass `len == 0`.
pub trait AddressSelector: Send + Sync {
    fn select(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl AddressSelector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

/// Always picks the same index, clamped to the answer length.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSelector(pub usize);

impl AddressSelector for FixedSelector {
    fn select(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

impl<F> AddressSelector for F
where
    F: Fn(usize) -> usize + Send + Sync,
{
    fn select(&self, len: usize) -> usize {
        self(len)
    }
}
