//! RawTable: fixed-capacity slot array with linear probing and byte-blob values.
//!
//! Every slot is `Empty`, `Tombstone` or `Occupied`. An occupied slot holds a
//! borrowed key and a value buffer obtained from the table's allocator. The
//! slot array itself also comes from that allocator and never grows.

use crate::allocator::{AllocError, Global, TableAllocator};
use crate::config::{DuplicatePolicy, RemovalMode, TableConfig};
use crate::error::{CreateError, InsertError};
use crate::hash::{home_slot, Probe};
use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};
use core::slice;
use log::{debug, trace, warn};

#[derive(Copy, Clone, Debug)]
enum Slot<'k> {
    Empty,
    Tombstone,
    Occupied { key: &'k str, value: NonNull<u8> },
}

/// Outcome of a successful insert.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Insertion {
    /// A free slot now holds the entry.
    New,
    /// An equal key was found and its value overwritten in place
    /// (`DuplicatePolicy::Overwrite` only).
    Replaced,
}

// Where an insert should land.
enum Vacancy {
    Match(NonNull<u8>),
    Free(usize),
    Full,
}

/// Fixed-capacity table mapping borrowed string keys to fixed-size byte values.
///
/// Keys are not copied: the table stores `&'k str` and compares key content,
/// so every key must outlive the table. Values are copied into buffers owned
/// by their slot; `lookup` hands out references into those buffers.
///
/// The table is `Send` when its allocator is, and performs no locking.
pub struct RawTable<'k, A: TableAllocator = Global> {
    slots: NonNull<Slot<'k>>,
    slots_layout: Layout,
    // Zero once the slot array has been released.
    capacity: usize,
    value_layout: Layout,
    len: usize,
    tombstones: usize,
    config: TableConfig,
    alloc: A,
}

// SAFETY: the slot array and value buffers are owned exclusively by the
// table, and `&str` keys are `Send`.
unsafe impl<'k, A: TableAllocator + Send> Send for RawTable<'k, A> {}

impl<'k> RawTable<'k, Global> {
    /// Table of `capacity` slots storing `value_size`-byte values on the heap.
    pub fn new(capacity: usize, value_size: usize) -> Result<Self, CreateError> {
        Self::new_in(capacity, value_size, Global)
    }
}

impl<'k, A: TableAllocator> RawTable<'k, A> {
    pub fn new_in(capacity: usize, value_size: usize, alloc: A) -> Result<Self, CreateError> {
        let value_layout = Layout::from_size_align(value_size, 1)
            .map_err(|_| CreateError::ValueTooLarge { size: value_size })?;
        Self::with_config_in(&TableConfig::new(capacity), value_layout, alloc)
    }

    pub fn with_config_in(
        config: &TableConfig,
        value_layout: Layout,
        mut alloc: A,
    ) -> Result<Self, CreateError> {
        config.validate()?;
        let capacity = config.capacity;
        let slots_layout = Layout::array::<Slot<'k>>(capacity)
            .map_err(|_| CreateError::SlotArrayTooLarge { capacity })?;
        let slots = alloc
            .allocate(slots_layout)
            .map_err(|e| {
                debug!("slot array allocation failed: {e}");
                e
            })?
            .cast::<Slot<'k>>();
        for i in 0..capacity {
            // SAFETY: the block fits `capacity` slots and is suitably aligned.
            unsafe { slots.as_ptr().add(i).write(Slot::Empty) };
        }
        debug!(
            "created table: {} slots, {}-byte values, {:?}, {:?}",
            capacity,
            value_layout.size(),
            config.removal,
            config.duplicates
        );
        Ok(Self {
            slots,
            slots_layout,
            capacity,
            value_layout,
            len: 0,
            tombstones: 0,
            config: *config,
            alloc,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn value_size(&self) -> usize {
        self.value_layout.size()
    }
    pub fn value_layout(&self) -> Layout {
        self.value_layout
    }
    /// Slots vacated by `remove` that still extend probe chains.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity as f64
    }
    pub fn config(&self) -> &TableConfig {
        &self.config
    }
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    // Keys of every occupied slot in slot order, reachable or not.
    #[cfg(test)]
    pub(crate) fn live_keys(&self) -> impl Iterator<Item = &'k str> + '_ {
        self.slots().iter().filter_map(|s| match *s {
            Slot::Occupied { key, .. } => Some(key),
            Slot::Empty | Slot::Tombstone => None,
        })
    }

    fn slots(&self) -> &[Slot<'k>] {
        // SAFETY: `slots` points at `capacity` initialized slots (or is
        // dangling with `capacity == 0` after release).
        unsafe { slice::from_raw_parts(self.slots.as_ptr(), self.capacity) }
    }

    fn slots_mut(&mut self) -> &mut [Slot<'k>] {
        // SAFETY: as in `slots`, and `&mut self` gives exclusive access.
        unsafe { slice::from_raw_parts_mut(self.slots.as_ptr(), self.capacity) }
    }

    // Index of the first occupied slot on `key`'s chain holding an equal key.
    fn find_index(&self, key: &str) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let slots = self.slots();
        for idx in Probe::new(home_slot(key, self.capacity), self.capacity) {
            match slots[idx] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied { key: k, .. } if k == key => return Some(idx),
                Slot::Occupied { .. } => {}
            }
        }
        None
    }

    fn find_vacancy(&self, key: &str, home: usize) -> Vacancy {
        let compare = self.config.duplicates == DuplicatePolicy::Overwrite;
        // Clear-mode removals can strand an equal key past an empty slot, so
        // overwriting there has to look at every slot.
        let exhaustive = compare && self.config.removal == RemovalMode::Clear;
        let mut reclaim = None;
        for idx in Probe::new(home, self.capacity) {
            match self.slots()[idx] {
                Slot::Empty if exhaustive => {
                    reclaim.get_or_insert(idx);
                }
                Slot::Empty => return Vacancy::Free(reclaim.unwrap_or(idx)),
                Slot::Tombstone if !compare => return Vacancy::Free(idx),
                Slot::Tombstone => {
                    reclaim.get_or_insert(idx);
                }
                Slot::Occupied { key: k, value } if compare && k == key => {
                    return Vacancy::Match(value)
                }
                Slot::Occupied { .. } => {}
            }
        }
        reclaim.map_or(Vacancy::Full, Vacancy::Free)
    }

    fn alloc_value(&mut self) -> Result<NonNull<u8>, AllocError> {
        if self.value_layout.size() == 0 {
            return Ok(NonNull::new(self.value_layout.align() as *mut u8)
                .unwrap_or(NonNull::dangling()));
        }
        self.alloc.allocate(self.value_layout)
    }

    // SAFETY: `value` must come from `alloc_value` and no slot may refer to it.
    unsafe fn free_value(&mut self, value: NonNull<u8>) {
        if self.value_layout.size() != 0 {
            // SAFETY: allocated by `self.alloc` with `value_layout`.
            unsafe { self.alloc.deallocate(value, self.value_layout) };
        }
    }

    /// Insert `key` with a copy of `value`, which must be exactly
    /// `value_size()` bytes.
    ///
    /// Under the default `DuplicatePolicy::Shadow` an existing equal key is
    /// not detected: a second entry is stored and lookups keep returning the
    /// first one in probe order.
    pub fn insert(&mut self, key: &'k str, value: &[u8]) -> Result<Insertion, InsertError> {
        if value.len() != self.value_size() {
            return Err(InsertError::ValueSizeMismatch {
                expected: self.value_size(),
                actual: value.len(),
            });
        }
        // SAFETY: `value` is readable for `value_size()` bytes.
        unsafe { self.insert_raw(key, value.as_ptr()) }
    }

    /// Insert `key` with a copy of the `value_size()` bytes at `src`.
    ///
    /// # Safety
    ///
    /// `src` must be readable for `value_size()` bytes.
    pub(crate) unsafe fn insert_raw(
        &mut self,
        key: &'k str,
        src: *const u8,
    ) -> Result<Insertion, InsertError> {
        if key.is_empty() {
            return Err(InsertError::EmptyKey);
        }
        let size = self.value_layout.size();
        let home = home_slot(key, self.capacity);
        let idx = match self.find_vacancy(key, home) {
            Vacancy::Match(value) => {
                // SAFETY: `value` is a live buffer of `size` bytes; caller
                // guarantees `src` is readable for `size` bytes.
                unsafe { ptr::copy(src, value.as_ptr(), size) };
                trace!("insert {key:?}: overwrote existing entry");
                return Ok(Insertion::Replaced);
            }
            Vacancy::Free(idx) => idx,
            Vacancy::Full => {
                debug!("insert {key:?}: all {} slots occupied", self.capacity);
                return Err(InsertError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
        };
        let value = self.alloc_value().map_err(|e| {
            debug!("insert {key:?}: value allocation failed: {e}");
            e
        })?;
        // SAFETY: fresh buffer of `size` bytes; `src` readable per contract.
        unsafe { ptr::copy_nonoverlapping(src, value.as_ptr(), size) };
        if let Slot::Tombstone = self.slots()[idx] {
            self.tombstones -= 1;
        }
        self.slots_mut()[idx] = Slot::Occupied { key, value };
        self.len += 1;
        trace!(
            "insert {key:?}: slot {idx}, {} past home",
            idx.wrapping_sub(home) & (self.capacity - 1)
        );
        Ok(Insertion::New)
    }

    /// Value stored for the first entry equal to `key` in probe order.
    pub fn lookup(&self, key: &str) -> Option<&[u8]> {
        let value = self.lookup_ptr(key)?;
        // SAFETY: occupied slots own an initialized buffer of `value_size`
        // bytes, borrowed here for no longer than `&self`.
        Some(unsafe { slice::from_raw_parts(value.as_ptr(), self.value_size()) })
    }

    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut [u8]> {
        let value = self.lookup_ptr(key)?;
        // SAFETY: as in `lookup`, with exclusive access through `&mut self`.
        Some(unsafe { slice::from_raw_parts_mut(value.as_ptr(), self.value_size()) })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_index(key).is_some()
    }

    pub(crate) fn lookup_ptr(&self, key: &str) -> Option<NonNull<u8>> {
        let idx = self.find_index(key)?;
        match self.slots()[idx] {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Tombstone => None,
        }
    }

    /// Remove the first entry equal to `key` and free its value buffer.
    /// Returns `false` if no entry matched.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_with(key, |_| ()).is_some()
    }

    /// Remove the first entry equal to `key`, passing its buffer to `read`
    /// before the buffer is freed.
    pub(crate) fn remove_with<R>(
        &mut self,
        key: &str,
        read: impl FnOnce(NonNull<u8>) -> R,
    ) -> Option<R> {
        let idx = self.find_index(key)?;
        let Slot::Occupied { value, .. } = self.slots()[idx] else {
            return None;
        };
        let out = read(value);
        self.vacate(idx);
        self.len -= 1;
        // SAFETY: the slot no longer refers to `value`.
        unsafe { self.free_value(value) };
        trace!("remove {key:?}: slot {idx}");
        Some(out)
    }

    fn vacate(&mut self, idx: usize) {
        match self.config.removal {
            RemovalMode::Clear => self.slots_mut()[idx] = Slot::Empty,
            RemovalMode::Tombstone => {
                let mask = self.capacity - 1;
                let next = (idx + 1) & mask;
                if next != idx && !matches!(self.slots()[next], Slot::Empty) {
                    self.slots_mut()[idx] = Slot::Tombstone;
                    self.tombstones += 1;
                    return;
                }
                // No chain continues past `idx`, so it and any tombstones
                // directly before it can become empty.
                self.slots_mut()[idx] = Slot::Empty;
                let mut prev = idx.wrapping_sub(1) & mask;
                while prev != idx && matches!(self.slots()[prev], Slot::Tombstone) {
                    self.slots_mut()[prev] = Slot::Empty;
                    self.tombstones -= 1;
                    prev = prev.wrapping_sub(1) & mask;
                }
            }
        }
    }

    /// Free every live value buffer and reset all slots to empty.
    pub fn clear(&mut self) {
        let mut freed = 0usize;
        for idx in 0..self.capacity {
            if let Slot::Occupied { value, .. } = self.slots()[idx] {
                self.slots_mut()[idx] = Slot::Empty;
                // SAFETY: the slot no longer refers to `value`.
                unsafe { self.free_value(value) };
                freed += 1;
            } else {
                self.slots_mut()[idx] = Slot::Empty;
            }
        }
        self.len = 0;
        self.tombstones = 0;
        debug!("cleared table: freed {freed} value buffers");
    }

    /// Release the slot array and consume the table.
    ///
    /// Value buffers of entries still present are not freed; they are leaked
    /// and their count is returned. Call `remove` or `clear` first to return
    /// them to the allocator. Dropping the table behaves the same way.
    pub fn destroy(mut self) -> usize {
        self.release()
    }

    fn release(&mut self) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        let leaked = self.len;
        // SAFETY: allocated in `with_config_in` with `slots_layout`; `Slot`
        // has no drop glue.
        unsafe { self.alloc.deallocate(self.slots.cast(), self.slots_layout) };
        self.slots = NonNull::dangling();
        self.capacity = 0;
        self.len = 0;
        self.tombstones = 0;
        if leaked > 0 {
            warn!("table destroyed with {leaked} live entries; their value buffers are leaked");
        } else {
            debug!("table destroyed");
        }
        leaked
    }
}

impl<'k, A: TableAllocator> Drop for RawTable<'k, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<'k, A: TableAllocator> fmt::Debug for RawTable<'k, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTable")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("tombstones", &self.tombstones)
            .field("value_size", &self.value_layout.size())
            .field("config", &self.config)
            .finish()
    }
}
