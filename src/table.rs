//! Table: typed front end over `RawTable` for plain `Copy` values.

use crate::allocator::{Global, TableAllocator};
use crate::config::TableConfig;
use crate::error::{CreateError, InsertError};
use crate::raw_table::{Insertion, RawTable};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;

/// Fixed-capacity table mapping borrowed string keys to values of type `T`.
///
/// Each value lives in its own buffer laid out for `T`. Keys are borrowed
/// for `'k`; see [`RawTable`] for probing, removal and teardown semantics.
pub struct Table<'k, T, A: TableAllocator = Global> {
    raw: RawTable<'k, A>,
    _values: PhantomData<T>,
}

impl<'k, T: Copy> Table<'k, T, Global> {
    pub fn new(capacity: usize) -> Result<Self, CreateError> {
        Self::new_in(capacity, Global)
    }
}

impl<'k, T: Copy, A: TableAllocator> Table<'k, T, A> {
    pub fn new_in(capacity: usize, alloc: A) -> Result<Self, CreateError> {
        Self::with_config_in(&TableConfig::new(capacity), alloc)
    }

    pub fn with_config_in(config: &TableConfig, alloc: A) -> Result<Self, CreateError> {
        Ok(Self {
            raw: RawTable::with_config_in(config, Layout::new::<T>(), alloc)?,
            _values: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
    pub fn tombstones(&self) -> usize {
        self.raw.tombstones()
    }
    pub fn load_factor(&self) -> f64 {
        self.raw.load_factor()
    }
    pub fn config(&self) -> &TableConfig {
        self.raw.config()
    }
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    pub fn insert(&mut self, key: &'k str, value: T) -> Result<Insertion, InsertError> {
        // SAFETY: the raw table's value layout is `Layout::new::<T>()`, so it
        // copies exactly `size_of::<T>()` bytes from `value`.
        unsafe { self.raw.insert_raw(key, (&value as *const T).cast()) }
    }

    pub fn lookup(&self, key: &str) -> Option<&T> {
        let p = self.raw.lookup_ptr(key)?;
        // SAFETY: the buffer was allocated for `T` and holds a copy of a `T`.
        Some(unsafe { &*p.cast::<T>().as_ptr() })
    }

    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut T> {
        let p = self.raw.lookup_ptr(key)?;
        // SAFETY: as in `lookup`; `&mut self` makes the access exclusive.
        Some(unsafe { &mut *p.cast::<T>().as_ptr() })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    /// Remove the first entry equal to `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        // SAFETY: the buffer holds a `T` and is read before being freed.
        self.raw
            .remove_with(key, |p| unsafe { p.cast::<T>().as_ptr().read() })
    }

    pub fn clear(&mut self) {
        self.raw.clear()
    }

    /// Release the slot array; see [`RawTable::destroy`]. Returns the number
    /// of leaked value buffers.
    pub fn destroy(self) -> usize {
        self.raw.destroy()
    }
}

impl<'k, T, A: TableAllocator> fmt::Debug for Table<'k, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("value_type", &core::any::type_name::<T>())
            .field("raw", &self.raw)
            .finish()
    }
}
