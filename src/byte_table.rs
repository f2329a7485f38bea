//! ByteTable: separate-chaining hash table over raw byte keys and values.
//!
//! Entries live in a `SlotMap` and never move once inserted. Each bucket
//! stores the handle of its chain head; every node stores the handle of
//! its successor. Resizing only rewrites those handles.

use crate::config::{Flags, TableConfig};
use crate::entry::Entry;
use crate::error::TableError;
use crate::hash_function::{HashFunction, XxHash};
use crate::reentrancy::DebugReentrancy;
use core::fmt;
use log::{debug, trace, warn};
use slotmap::{DefaultKey, SlotMap};
use std::borrow::Cow;

/// Stable reference to an entry. Survives resizes; a removed entry's
/// handle never resolves again, even if its slot is reused.
///
/// A handle is only meaningful for the table that issued it. Passed to
/// another table it may resolve to an unrelated entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'t, H>(&self, table: &'t ByteTable<'_, H>) -> Option<&'t [u8]>
    where
        H: HashFunction,
    {
        table.raw.nodes.get(self.0).map(|n| n.entry.key())
    }

    pub fn value<'t, H>(&self, table: &'t ByteTable<'_, H>) -> Option<&'t [u8]>
    where
        H: HashFunction,
    {
        table.raw.nodes.get(self.0).map(|n| n.entry.value())
    }
}

#[derive(Debug)]
struct Node<'a> {
    entry: Entry<'a>,
    next: Option<DefaultKey>,
}

type Bucket = Option<DefaultKey>;

enum Probe {
    Occupied(DefaultKey),
    Vacant { tail: Option<DefaultKey> },
}

/// Arrays for one rehash, allocated before the table is touched so a
/// failed allocation leaves it as it was.
struct Rebuild {
    buckets: Vec<Bucket>,
    tails: Vec<Bucket>,
}

impl Rebuild {
    fn alloc(capacity: usize) -> Result<Self, TableError> {
        Ok(Self {
            buckets: alloc_buckets(capacity)?,
            tails: alloc_buckets(capacity)?,
        })
    }
}

/// Hash table keyed and valued by byte sequences.
///
/// `'a` bounds the caller memory a table may borrow under
/// [`Flags::KEY_BORROWED`] / [`Flags::VALUE_BORROWED`]. Tables that only
/// own their bytes can use `ByteTable<'static>` and pass `Vec<u8>`.
///
/// Not synchronized: share behind a `Mutex` if several threads need it.
/// A resize rehashes every entry in one synchronous pass and is the
/// table's main latency spike.
pub struct ByteTable<'a, H = XxHash> {
    raw: RawTable<'a, H>,
    reentrancy: DebugReentrancy,
}

/// The chaining engine. Kept apart from the reentrancy tracker so public
/// methods can hold a guard while mutating it.
struct RawTable<'a, H> {
    hasher: H,
    nodes: SlotMap<DefaultKey, Node<'a>>,
    buckets: Vec<Bucket>,
    collisions: usize,
    load_factor: f64,
    config: TableConfig,
}

fn alloc_buckets(capacity: usize) -> Result<Vec<Bucket>, TableError> {
    if capacity == 0 {
        return Err(TableError::ZeroCapacity);
    }
    let mut buckets = Vec::new();
    if buckets.try_reserve_exact(capacity).is_err() {
        let bytes = capacity.saturating_mul(core::mem::size_of::<Bucket>());
        warn!("could not allocate a bucket array of {capacity} buckets");
        return Err(TableError::OutOfMemory { bytes });
    }
    buckets.resize(capacity, None);
    Ok(buckets)
}

#[inline]
fn bucket_index<H: HashFunction>(hasher: &H, seed: u32, key: &[u8], capacity: usize) -> usize {
    hasher.hash32(key, seed) as usize % capacity
}

impl<'a> ByteTable<'a, XxHash> {
    /// Owned keys and values, autoresize on, default threshold and seed.
    pub fn new() -> Self {
        let config = TableConfig::default();
        let buckets = vec![None; config.initial_capacity];
        Self::from_raw(RawTable::new(XxHash, config, buckets))
    }

    pub fn with_config(config: TableConfig) -> Result<Self, TableError> {
        Self::with_hasher(config, XxHash)
    }

    /// Shorthand for the common `(flags, max_load_factor)` setup.
    pub fn with_flags(flags: Flags, max_load_factor: f64) -> Result<Self, TableError> {
        Self::with_config(
            TableConfig::default()
                .with_flags(flags)
                .with_max_load_factor(max_load_factor),
        )
    }
}

impl Default for ByteTable<'_, XxHash> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H> ByteTable<'a, H>
where
    H: HashFunction,
{
    pub fn with_hasher(config: TableConfig, hasher: H) -> Result<Self, TableError> {
        config.validate()?;
        let buckets = alloc_buckets(config.initial_capacity)?;
        Ok(Self::from_raw(RawTable::new(hasher, config, buckets)))
    }

    fn from_raw(raw: RawTable<'a, H>) -> Self {
        Self {
            raw,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.raw.buckets.len()
    }

    /// Entries that are not the head of their chain.
    pub fn collisions(&self) -> usize {
        self.raw.collisions
    }

    /// `collisions / capacity`, as of the last structural change.
    pub fn load_factor(&self) -> f64 {
        self.raw.load_factor
    }

    pub fn max_load_factor(&self) -> f64 {
        self.raw.config.max_load_factor
    }

    pub fn flags(&self) -> Flags {
        self.raw.config.flags
    }

    pub fn seed(&self) -> u32 {
        self.raw.config.seed
    }

    pub fn hasher(&self) -> &H {
        &self.raw.hasher
    }

    /// Bucket `key` maps to under the current capacity and seed.
    pub fn index_of(&self, key: &[u8]) -> usize {
        let _g = self.reentrancy.enter();
        self.raw.bucket_for(key)
    }

    /// Wide digest of `key` from the table's hash function, if it has one.
    /// Not used for placement.
    pub fn wide_digest(&self, key: &[u8]) -> Option<u128> {
        let _g = self.reentrancy.enter();
        self.raw.hasher.hash128(key, self.raw.config.seed)
    }

    /// Inserts `key -> value`, or replaces the value if `key` is present.
    ///
    /// Bytes are copied or borrowed according to the table's flags. If the
    /// insert would trigger an autoresize, the larger bucket array is
    /// allocated first. On error, including a failed autoresize, nothing
    /// changes.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Result<(), TableError>
    where
        K: Into<Cow<'a, [u8]>>,
        V: Into<Cow<'a, [u8]>>,
    {
        let _g = self.reentrancy.enter();
        self.raw.insert(key.into(), value.into()).map(|_| ())
    }

    /// Inserts a pre-built entry and returns the handle of the entry that
    /// now holds its value. If the key is already present, only the value
    /// is taken over and the rest of `entry` is dropped.
    ///
    /// The entry's bytes are stored under this table's flags, whatever
    /// flags it was built with: an owning table copies borrowed parts.
    pub fn insert_entry(&mut self, entry: Entry<'a>) -> Result<Handle, TableError> {
        let _g = self.reentrancy.enter();
        let (key, value) = entry.into_parts();
        self.raw.insert(key, value).map(Handle)
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let _g = self.reentrancy.enter();
        let h = self.raw.lookup(key)?;
        self.raw.nodes.get(h).map(|n| n.entry.value())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let _g = self.reentrancy.enter();
        self.raw.lookup(key).is_some()
    }

    pub fn find(&self, key: &[u8]) -> Option<Handle> {
        let _g = self.reentrancy.enter();
        self.raw.lookup(key).map(Handle)
    }

    /// Removes and drops the entry for `key`. Returns whether one existed.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Unlinks the entry for `key` and hands it back.
    pub fn remove_entry(&mut self, key: &[u8]) -> Option<Entry<'a>> {
        let _g = self.reentrancy.enter();
        self.raw.unlink(key)
    }

    /// Rebuilds the bucket array with `new_capacity` buckets (grow or
    /// shrink) and relinks every entry. Entries themselves are not moved or
    /// copied. On error the table is unchanged.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), TableError> {
        let _g = self.reentrancy.enter();
        self.raw.rehash(new_capacity)
    }

    /// Drops every entry and restores the initial capacity. Flags,
    /// threshold, seed and hash function are kept.
    pub fn clear(&mut self) -> Result<(), TableError> {
        let _g = self.reentrancy.enter();
        self.raw.clear()
    }

    /// Every key, in bucket order and chain order within a bucket.
    pub fn keys(&self) -> Vec<&[u8]> {
        let _g = self.reentrancy.enter();
        let mut keys = Vec::with_capacity(self.raw.nodes.len());
        keys.extend(self.iter().map(|(k, _)| k));
        keys
    }

    /// Key/value pairs in the same order as [`keys`](Self::keys).
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            nodes: &self.raw.nodes,
            buckets: self.raw.buckets.iter(),
            chain: Chain::empty(&self.raw.nodes),
            remaining: self.raw.nodes.len(),
        }
    }

    /// Length of each chain, bucket by bucket.
    pub fn chain_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        let nodes = &self.raw.nodes;
        self.raw
            .buckets
            .iter()
            .map(move |&head| Chain { nodes, cursor: head }.count())
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.raw.assert_invariants();
    }
}

impl<'a, H> RawTable<'a, H>
where
    H: HashFunction,
{
    fn new(hasher: H, config: TableConfig, buckets: Vec<Bucket>) -> Self {
        Self {
            hasher,
            nodes: SlotMap::with_key(),
            buckets,
            collisions: 0,
            load_factor: 0.0,
            config,
        }
    }

    fn bucket_for(&self, key: &[u8]) -> usize {
        bucket_index(&self.hasher, self.config.seed, key, self.buckets.len())
    }

    fn chain(&self, index: usize) -> Chain<'_, 'a> {
        Chain {
            nodes: &self.nodes,
            cursor: self.buckets.get(index).copied().flatten(),
        }
    }

    fn lookup(&self, key: &[u8]) -> Option<DefaultKey> {
        let index = self.bucket_for(key);
        self.chain(index)
            .find(|(_, node)| node.entry.key_eq(key))
            .map(|(h, _)| h)
    }

    /// Walks the chain at `index` once: either the match, or the tail to
    /// append after.
    fn probe(&self, index: usize, key: &[u8]) -> Probe {
        let mut tail = None;
        for (h, node) in self.chain(index) {
            if node.entry.key_eq(key) {
                return Probe::Occupied(h);
            }
            tail = Some(h);
        }
        Probe::Vacant { tail }
    }

    // A present key gets its value replaced without building a new entry,
    // so replacing never copies the key.
    fn insert(
        &mut self,
        key: Cow<'a, [u8]>,
        value: Cow<'a, [u8]>,
    ) -> Result<DefaultKey, TableError> {
        let index = self.bucket_for(&key);
        match self.probe(index, &key) {
            Probe::Occupied(h) => {
                if let Some(node) = self.nodes.get_mut(h) {
                    node.entry.set_value(self.config.flags, value)?;
                }
                Ok(h)
            }
            Probe::Vacant { tail } => {
                let growth = self.reserve_growth(tail.is_some())?;
                let entry = Entry::new(self.config.flags, key, value)?;
                Ok(self.link(index, tail, entry, growth))
            }
        }
    }

    /// Allocates the doubled bucket array when appending behind an existing
    /// head would push the load factor over the threshold.
    fn reserve_growth(&self, collides: bool) -> Result<Option<Rebuild>, TableError> {
        if !collides || !self.config.flags.autoresize() {
            return Ok(None);
        }
        let load = (self.collisions + 1) as f64 / self.buckets.len() as f64;
        if load <= self.config.max_load_factor {
            return Ok(None);
        }
        let target = self.buckets.len().saturating_mul(2);
        trace!(
            "load factor {:.4} would exceed {:.4}, growing to {} buckets",
            load,
            self.config.max_load_factor,
            target
        );
        Rebuild::alloc(target).map(Some)
    }

    /// Appends `entry` to the chain at `index`, then relinks into `growth`
    /// if the autoresize policy asked for it.
    fn link(
        &mut self,
        index: usize,
        tail: Option<DefaultKey>,
        entry: Entry<'a>,
        growth: Option<Rebuild>,
    ) -> DefaultKey {
        let handle = self.nodes.insert(Node { entry, next: None });
        match tail {
            None => {
                if let Some(bucket) = self.buckets.get_mut(index) {
                    *bucket = Some(handle);
                }
            }
            Some(t) => {
                if let Some(tn) = self.nodes.get_mut(t) {
                    tn.next = Some(handle);
                }
                self.collisions += 1;
            }
        }
        match growth {
            Some(rebuild) => self.relink(rebuild),
            None => self.refresh_load_factor(),
        }
        handle
    }

    fn unlink(&mut self, key: &[u8]) -> Option<Entry<'a>> {
        let index = self.bucket_for(key);
        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.buckets.get(index).copied().flatten();
        while let Some(h) = cursor {
            let node = self.nodes.get(h)?;
            if !node.entry.key_eq(key) {
                prev = Some(h);
                cursor = node.next;
                continue;
            }
            let next = node.next;
            match prev {
                None => {
                    if let Some(bucket) = self.buckets.get_mut(index) {
                        *bucket = next;
                    }
                }
                Some(p) => {
                    if let Some(pn) = self.nodes.get_mut(p) {
                        pn.next = next;
                    }
                }
            }
            // The chain loses one entry; unless it is now empty, it also
            // loses one non-head entry.
            if prev.is_some() || next.is_some() {
                self.collisions -= 1;
            }
            let removed = self.nodes.remove(h)?;
            self.refresh_load_factor();
            return Some(removed.entry);
        }
        None
    }

    /// Relinks every entry into a fresh array of `new_capacity` buckets.
    ///
    /// Never consults the autoresize threshold, so one resize can not
    /// trigger another.
    fn rehash(&mut self, new_capacity: usize) -> Result<(), TableError> {
        let rebuild = Rebuild::alloc(new_capacity)?;
        self.relink(rebuild);
        Ok(())
    }

    /// Moves every node into `rebuild.buckets`, keeping chain order. The
    /// tail of each new chain is tracked so every append is O(1).
    fn relink(&mut self, rebuild: Rebuild) {
        let Rebuild {
            mut buckets,
            mut tails,
        } = rebuild;
        let new_capacity = buckets.len();
        let old = core::mem::take(&mut self.buckets);
        let mut collisions = 0usize;

        for &head in &old {
            let mut cursor = head;
            while let Some(h) = cursor {
                let Some(node) = self.nodes.get_mut(h) else {
                    break;
                };
                cursor = node.next.take();
                let index =
                    bucket_index(&self.hasher, self.config.seed, node.entry.key(), new_capacity);
                let Some(tail) = tails.get_mut(index) else {
                    continue;
                };
                match tail.replace(h) {
                    None => {
                        if let Some(bucket) = buckets.get_mut(index) {
                            *bucket = Some(h);
                        }
                    }
                    Some(prev) => {
                        if let Some(pn) = self.nodes.get_mut(prev) {
                            pn.next = Some(h);
                        }
                        collisions += 1;
                    }
                }
            }
        }

        debug!(
            "resized table: {} -> {} buckets, {} entries, {} collisions",
            old.len(),
            new_capacity,
            self.nodes.len(),
            collisions
        );
        self.buckets = buckets;
        self.collisions = collisions;
        self.refresh_load_factor();
    }

    fn clear(&mut self) -> Result<(), TableError> {
        let buckets = alloc_buckets(self.config.initial_capacity)?;
        debug!(
            "clearing table: dropping {} entries, {} -> {} buckets",
            self.nodes.len(),
            self.buckets.len(),
            buckets.len()
        );
        self.nodes.clear();
        self.buckets = buckets;
        self.collisions = 0;
        self.load_factor = 0.0;
        Ok(())
    }

    fn refresh_load_factor(&mut self) {
        self.load_factor = self.collisions as f64 / self.buckets.len() as f64;
    }

    /// Recounts everything by walking the chains and checks it against the
    /// tracked statistics.
    #[cfg(test)]
    fn assert_invariants(&self) {
        let mut reachable = 0usize;
        let mut non_empty = 0usize;
        for (index, &head) in self.buckets.iter().enumerate() {
            if head.is_some() {
                non_empty += 1;
            }
            for (_, node) in (Chain { nodes: &self.nodes, cursor: head }) {
                assert_eq!(self.bucket_for(node.entry.key()), index, "entry in wrong bucket");
                reachable += 1;
            }
        }
        assert_eq!(reachable, self.nodes.len(), "key count differs from chain walk");
        assert_eq!(
            self.collisions,
            self.nodes.len() - non_empty,
            "collisions differ from non-head entry count"
        );
        let expected = self.collisions as f64 / self.buckets.len() as f64;
        assert!((self.load_factor - expected).abs() < 1e-12);
    }
}

impl<H> fmt::Debug for ByteTable<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = &self.raw;
        f.debug_struct("ByteTable")
            .field("len", &raw.nodes.len())
            .field("capacity", &raw.buckets.len())
            .field("collisions", &raw.collisions)
            .field("load_factor", &raw.load_factor)
            .field("max_load_factor", &raw.config.max_load_factor)
            .field("flags", &raw.config.flags)
            .field("seed", &raw.config.seed)
            .finish_non_exhaustive()
    }
}

/// Walks one chain from a given node.
struct Chain<'t, 'a> {
    nodes: &'t SlotMap<DefaultKey, Node<'a>>,
    cursor: Option<DefaultKey>,
}

impl<'t, 'a> Chain<'t, 'a> {
    fn empty(nodes: &'t SlotMap<DefaultKey, Node<'a>>) -> Self {
        Chain { nodes, cursor: None }
    }
}

impl<'t, 'a> Iterator for Chain<'t, 'a> {
    type Item = (DefaultKey, &'t Node<'a>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let h = self.cursor?;
        let node = self.nodes.get(h)?;
        self.cursor = node.next;
        Some((h, node))
    }
}

/// Iterator over `(key, value)` pairs of a [`ByteTable`].
pub struct Iter<'t, 'a> {
    nodes: &'t SlotMap<DefaultKey, Node<'a>>,
    buckets: core::slice::Iter<'t, Bucket>,
    chain: Chain<'t, 'a>,
    remaining: usize,
}

impl<'t, 'a> Iterator for Iter<'t, 'a> {
    type Item = (&'t [u8], &'t [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, node)) = self.chain.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some((node.entry.key(), node.entry.value()));
            }
            let head = *self.buckets.next()?;
            self.chain = Chain { nodes: self.nodes, cursor: head };
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_, '_> {}

impl<'t, 'a, H> IntoIterator for &'t ByteTable<'a, H>
where
    H: HashFunction,
{
    type Item = (&'t [u8], &'t [u8]);
    type IntoIter = Iter<'t, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
