//! Table configuration: behaviour flags, load-factor threshold, digest seed.
//!
//! The digest seed is copied into each table when it is built. The
//! process-wide default only influences tables constructed after it was
//! changed; a live table never observes a new seed.

use crate::entry::Ownership;
use crate::error::TableError;
use core::fmt;
use core::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of buckets a freshly built or cleared table starts with.
pub const DEFAULT_CAPACITY: usize = 64;

/// Default ratio of collisions to buckets before an autoresize.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.05;

/// Seed used by tables unless the process default or the config overrides it.
pub const DEFAULT_SEED: u32 = 2_976_579_765;

static PROCESS_SEED: AtomicU32 = AtomicU32::new(DEFAULT_SEED);

/// Changes the seed that tables built from now on copy at construction.
///
/// Existing tables keep the seed they were built with, so their bucket
/// placement stays valid.
pub fn set_default_seed(seed: u32) {
    PROCESS_SEED.store(seed, Ordering::Relaxed);
}

/// The seed a table built right now would use by default.
pub fn default_seed() -> u32 {
    PROCESS_SEED.load(Ordering::Relaxed)
}

/// Behaviour bits recognised by a table.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Flags(u8);

impl Flags {
    /// Copy keys and values, autoresize on.
    pub const NONE: Flags = Flags(0);
    /// Store keys by reference to caller memory.
    pub const KEY_BORROWED: Flags = Flags(1);
    /// Store values by reference to caller memory.
    pub const VALUE_BORROWED: Flags = Flags(1 << 1);
    /// Never grow on load factor; capacity only changes through `resize`.
    pub const NO_AUTORESIZE: Flags = Flags(1 << 2);

    const ALL: u8 = 0b111;

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds flags from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Flags(bits & Self::ALL)
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn key_ownership(self) -> Ownership {
        if self.contains(Self::KEY_BORROWED) {
            Ownership::Borrowed
        } else {
            Ownership::Owned
        }
    }

    pub fn value_ownership(self) -> Ownership {
        if self.contains(Self::VALUE_BORROWED) {
            Ownership::Borrowed
        } else {
            Ownership::Owned
        }
    }

    pub fn autoresize(self) -> bool {
        !self.contains(Self::NO_AUTORESIZE)
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::KEY_BORROWED, "KEY_BORROWED"),
            (Self::VALUE_BORROWED, "VALUE_BORROWED"),
            (Self::NO_AUTORESIZE, "NO_AUTORESIZE"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in names {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Construction parameters for a [`ByteTable`](crate::ByteTable).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub flags: Flags,
    /// Collisions-to-buckets ratio above which the table doubles.
    pub max_load_factor: f64,
    pub seed: u32,
    /// Bucket count at construction and after `clear`.
    pub initial_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            flags: Flags::NONE,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            seed: default_seed(),
            initial_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl TableConfig {
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TableError> {
        if !self.max_load_factor.is_finite() || self.max_load_factor < 0.0 {
            return Err(TableError::InvalidLoadFactor(self.max_load_factor));
        }
        if self.initial_capacity == 0 {
            return Err(TableError::ZeroCapacity);
        }
        Ok(())
    }
}
