//! Slot addressing: the content-sum hash and the linear probe order.
//!
//! The hash is the wrapping sum of the key's bytes. It is cheap and
//! order-insensitive (anagrams collide), and offers no protection against
//! adversarial keys.

/// Wrapping byte sum of `key`.
#[inline]
pub fn content_sum(key: &str) -> u32 {
    key.bytes().fold(0u32, |acc, b| acc.wrapping_add(u32::from(b)))
}

/// Home slot of `key` in a table of `capacity` slots (a power of two).
#[inline]
pub fn home_slot(key: &str, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    content_sum(key) as usize & (capacity - 1)
}

/// Slot indices visited when probing from `start`: every slot exactly
/// once, wrapping from `capacity - 1` to `0`.
#[derive(Clone, Debug)]
pub struct Probe {
    next: usize,
    mask: usize,
    remaining: usize,
}

impl Probe {
    pub fn new(start: usize, capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            next: start & (capacity - 1),
            mask: capacity - 1,
            remaining: capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.next;
        self.next = (idx + 1) & self.mask;
        self.remaining -= 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}

impl core::iter::FusedIterator for Probe {}
