use crate::allocator::AllocError;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum CreateError {
    #[error("capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo { capacity: usize },
    #[error("slot array for capacity {capacity} exceeds the addressable size")]
    SlotArrayTooLarge { capacity: usize },
    #[error("value size {size} exceeds the addressable size")]
    ValueTooLarge { size: usize },
    #[error("could not allocate the slot array: {0}")]
    Alloc(#[from] AllocError),
}

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum InsertError {
    #[error("table is full ({capacity} slots)")]
    CapacityExceeded { capacity: usize },
    #[error("key must not be empty")]
    EmptyKey,
    #[error("value is {actual} bytes, table stores {expected}-byte values")]
    ValueSizeMismatch { expected: usize, actual: usize },
    #[error("could not allocate a value buffer: {0}")]
    Alloc(#[from] AllocError),
}
