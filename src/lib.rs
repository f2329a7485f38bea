//! byte-table: a single-threaded, separate-chaining hash table whose keys
//! and values are raw byte sequences.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: associative storage for callers that do not want to commit to a
//!   key or value type; everything is `[u8]`.
//! - Layers:
//!   - HashFunction: pluggable "bytes + 32-bit seed -> 32-bit digest"
//!     contract (`XxHash` by default, any `fn(&[u8], u32) -> u32` works).
//!   - Entry: one key/value pair, owning a copy of the bytes or borrowing
//!     caller memory, per the table's flags.
//!   - ByteTable: bucket array of chains, statistics (key count,
//!     collisions, load factor), CRUD, resize, enumeration.
//!
//! Chains
//! - Entries live in a `slotmap::SlotMap`; a bucket holds the handle of
//!   its chain head and each node the handle of its successor. Nodes never
//!   move, so resizing only relinks handles and `Handle`s stay valid
//!   across resizes.
//! - A key appears at most once: inserting a present key replaces its
//!   value.
//!
//! Load factor and resizing
//! - `collisions` counts entries that are not the head of their chain;
//!   `load_factor = collisions / capacity`.
//! - When an insert lands behind an existing head and the load factor then
//!   exceeds the configured maximum, capacity doubles (unless
//!   `Flags::NO_AUTORESIZE`). Rehashing never re-checks the threshold, so a
//!   resize can not recurse into another one.
//! - `resize` may also be called directly to grow or shrink (min. 1).
//!
//! Seeds
//! - Each table copies its digest seed at construction. The process-wide
//!   default (`set_default_seed`) only affects tables built afterwards.
//!
//! Ownership
//! - `Flags::KEY_BORROWED` / `Flags::VALUE_BORROWED` make a table keep
//!   references instead of copies. The table's lifetime parameter ties it
//!   to the borrowed memory, so the borrow checker rules out dangling
//!   entries.
//!
//! Constraints
//! - Single-threaded: no locks, no atomics inside a table. A debug-only
//!   reentrancy guard catches a digest function that calls back into the
//!   table it is hashing for.
//! - Allocation failures of key/value copies and bucket arrays come back
//!   as `TableError::OutOfMemory`; a missing key is never an error.
//!
//! ```
//! use byte_table::{ByteTable, Flags};
//!
//! let mut table = ByteTable::with_flags(Flags::NONE, 0.05)?;
//! table.insert(b"apple".to_vec(), b"red".to_vec())?;
//! assert_eq!(table.get(b"apple"), Some(&b"red"[..]));
//!
//! table.insert(b"apple".to_vec(), b"green".to_vec())?;
//! assert_eq!(table.len(), 1);
//!
//! assert!(table.remove(b"apple"));
//! assert!(table.keys().is_empty());
//! # Ok::<(), byte_table::TableError>(())
//! ```

pub mod byte_table;
mod byte_table_proptest;
pub mod config;
pub mod entry;
pub mod error;
pub mod hash_function;
mod reentrancy;

// Public surface
pub use byte_table::{ByteTable, Handle, Iter};
pub use config::{
    default_seed, set_default_seed, Flags, TableConfig, DEFAULT_CAPACITY,
    DEFAULT_MAX_LOAD_FACTOR, DEFAULT_SEED,
};
pub use entry::{Entry, Ownership};
pub use error::TableError;
pub use hash_function::{HashFunction, XxHash};
