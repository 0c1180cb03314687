//! Construction-time settings for a table.

use crate::error::CreateError;

/// What `remove` leaves behind in the vacated slot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum RemovalMode {
    /// Mark the slot deleted. Lookups probe past it and inserts may reuse it,
    /// so removing one key never hides another key on the same chain.
    #[default]
    Tombstone,
    /// Reset the slot to empty. Lookups stop there, so a key stored past the
    /// removed slot on a shared probe chain becomes unreachable. Kept for
    /// bit-for-bit parity with tables that never had tombstones.
    Clear,
}

/// How `insert` treats a key that is already present.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DuplicatePolicy {
    /// Store a second entry in the next free slot without comparing keys.
    /// Lookups return whichever copy comes first in probe order.
    #[default]
    Shadow,
    /// Compare keys along the probe chain and overwrite a match in place.
    /// Combined with `RemovalMode::Clear` every insert scans the whole table,
    /// so a key stranded by a removal is still overwritten, not duplicated.
    Overwrite,
}

/// Table settings. Capacity must be a non-zero power of two.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableConfig {
    pub capacity: usize,
    pub removal: RemovalMode,
    pub duplicates: DuplicatePolicy,
}

impl TableConfig {
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            removal: RemovalMode::Tombstone,
            duplicates: DuplicatePolicy::Shadow,
        }
    }

    pub const fn removal(mut self, removal: RemovalMode) -> Self {
        self.removal = removal;
        self
    }

    pub const fn duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Check the capacity; slot indices are derived by masking with
    /// `capacity - 1`.
    pub fn validate(&self) -> Result<(), CreateError> {
        if !self.capacity.is_power_of_two() {
            return Err(CreateError::CapacityNotPowerOfTwo {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TableConfig::new(16);
        assert_eq!(c.removal, RemovalMode::Tombstone);
        assert_eq!(c.duplicates, DuplicatePolicy::Shadow);
        assert!(c.validate().is_ok());
    }

    /// Invariant: only non-zero powers of two pass validation.
    #[test]
    fn validate_power_of_two() {
        for ok in [1usize, 2, 4, 1024, 4096, 1 << 20] {
            assert!(TableConfig::new(ok).validate().is_ok(), "{ok}");
        }
        for bad in [0usize, 3, 6, 100, 4095, 4097] {
            assert_eq!(
                TableConfig::new(bad).validate(),
                Err(CreateError::CapacityNotPowerOfTwo { capacity: bad })
            );
        }
    }

    #[test]
    fn builder_sets_fields() {
        let c = TableConfig::new(8)
            .removal(RemovalMode::Clear)
            .duplicates(DuplicatePolicy::Overwrite);
        assert_eq!(c.capacity, 8);
        assert_eq!(c.removal, RemovalMode::Clear);
        assert_eq!(c.duplicates, DuplicatePolicy::Overwrite);
    }
}
