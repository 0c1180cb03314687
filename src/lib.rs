//! probe-table: a fixed-capacity, string-keyed table over one flat slot
//! array, using open addressing with linear probing.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an embeddable lookup structure for workloads whose maximum key
//!   count is known up front, with every byte of memory obtained from an
//!   allocator the host supplies.
//! - Layers:
//!   - RawTable<'k, A>: structural layer. Owns the slot array and the value
//!     buffers; values are byte blobs of a layout fixed at construction.
//!   - Table<'k, T, A>: typed layer for `T: Copy`; buffers are laid out for
//!     `T` and values are copied in and out.
//!   - TableAllocator: the capability both layers allocate through.
//!     `Global`, `TrackingAllocator` and `BoundedAllocator` are provided.
//!
//! Constraints
//! - Capacity is a power of two, validated at construction, and never
//!   changes; there is no rehashing.
//! - Keys are borrowed (`&'k str`) and compared by content. The table never
//!   copies or frees them, so each key must outlive the table.
//! - One allocation per stored value; none for lookups or removals.
//! - Single-threaded: no locking. Tables are `Send` when their allocator
//!   is, so callers can serialize access behind a `Mutex`.
//!
//! Hashing and probing
//! - The home slot is the wrapping byte sum of the key masked to the
//!   capacity. Anagrams collide; adversarial keys degrade every operation
//!   to a full scan.
//! - Probing walks forward one slot at a time, wrapping once; every
//!   operation visits each slot at most once.
//!
//! Removal
//! - `RemovalMode::Tombstone` (default) leaves a marker that lookups step
//!   over and inserts reuse, so removals never hide other keys. A removal
//!   at the tail of a chain empties the slot and any tombstones before it.
//! - `RemovalMode::Clear` resets the slot to empty. A key stored past that
//!   slot on the same chain becomes unreachable; kept for parity with
//!   tables that behave this way.
//!
//! Duplicates
//! - `DuplicatePolicy::Shadow` (default) does not compare keys on insert:
//!   a duplicate gets its own slot and lookups return the first one in
//!   probe order.
//! - `DuplicatePolicy::Overwrite` replaces the value of an equal key in
//!   place.
//!
//! Teardown
//! - `destroy` (and `Drop`) release the slot array only. Buffers of entries
//!   still present are leaked and counted; `remove` or `clear` them first.
//!
//! Notes and non-goals
//! - No iteration over entries, no resizing, no concurrent mutation.

pub mod allocator;
pub mod config;
pub mod error;
pub mod hash;
pub mod raw_table;
mod raw_table_proptest;
pub mod table;
pub mod tracking;

// Public surface
pub use allocator::{AllocError, Global, TableAllocator};
pub use config::{DuplicatePolicy, RemovalMode, TableConfig};
pub use error::{CreateError, InsertError};
pub use raw_table::{Insertion, RawTable};
pub use table::Table;
pub use tracking::{BoundedAllocator, TrackingAllocator};
