//! Key/value entries and their ownership of the underlying bytes.

use crate::config::Flags;
use crate::error::TableError;
use log::warn;
use std::borrow::Cow;

/// Whether a table copies bytes it is given or keeps the caller's reference.
///
/// Fixed per table through [`Flags`]; every entry of a table follows the
/// same rule for keys and the same rule for values.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Ownership {
    /// The entry holds its own copy, released when the entry is dropped.
    #[default]
    Owned,
    /// The entry references caller memory, which must outlive the table.
    Borrowed,
}

impl Ownership {
    fn adopt<'a>(self, bytes: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, TableError> {
        match (self, bytes) {
            (Ownership::Borrowed, bytes) => Ok(bytes),
            (Ownership::Owned, Cow::Owned(buf)) => Ok(Cow::Owned(buf)),
            (Ownership::Owned, Cow::Borrowed(src)) => copy_bytes(src).map(Cow::Owned),
        }
    }
}

fn copy_bytes(src: &[u8]) -> Result<Vec<u8>, TableError> {
    let mut buf = Vec::new();
    if buf.try_reserve_exact(src.len()).is_err() {
        warn!("could not allocate {} bytes for an entry buffer", src.len());
        return Err(TableError::OutOfMemory { bytes: src.len() });
    }
    buf.extend_from_slice(src);
    Ok(buf)
}

/// One key/value pair of a table.
///
/// The key never changes after construction; the value may be replaced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry<'a> {
    key: Cow<'a, [u8]>,
    value: Cow<'a, [u8]>,
}

impl<'a> Entry<'a> {
    /// Builds an entry, copying the key and/or value as `flags` demand.
    ///
    /// If the value copy fails after the key was copied, the key copy is
    /// released before the error is returned.
    pub fn new<K, V>(flags: Flags, key: K, value: V) -> Result<Self, TableError>
    where
        K: Into<Cow<'a, [u8]>>,
        V: Into<Cow<'a, [u8]>>,
    {
        let key = flags.key_ownership().adopt(key.into())?;
        let value = flags.value_ownership().adopt(value.into())?;
        Ok(Self { key, value })
    }

    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Exact byte comparison: same length and same bytes.
    #[inline]
    pub fn key_eq(&self, key: &[u8]) -> bool {
        *self.key == *key
    }

    /// Replaces the value following the value ownership in `flags`.
    ///
    /// On allocation failure the previous value is kept.
    pub fn set_value<V>(&mut self, flags: Flags, value: V) -> Result<(), TableError>
    where
        V: Into<Cow<'a, [u8]>>,
    {
        self.value = flags.value_ownership().adopt(value.into())?;
        Ok(())
    }

    pub fn is_key_owned(&self) -> bool {
        matches!(self.key, Cow::Owned(_))
    }

    pub fn is_value_owned(&self) -> bool {
        matches!(self.value, Cow::Owned(_))
    }

    pub fn into_parts(self) -> (Cow<'a, [u8]>, Cow<'a, [u8]>) {
        (self.key, self.value)
    }
}
