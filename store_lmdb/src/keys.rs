//! Composite key encoding.
//!
//! Variable-length string components are written as a big-endian `u16`
//! length followed by the bytes, so a component is never a prefix of a
//! different one and prefix scans stay exact. Numbers are big-endian so byte
//! order matches numeric order.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use crate::LmdbError;

pub(crate) fn push_str(key: &mut Vec<u8>, raw: &str) -> Result<(), LmdbError> {
    let bytes = raw.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| LmdbError::KeyTooLong(bytes.len()))?;
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn str_key(raw: &str) -> Result<Vec<u8>, LmdbError> {
    let mut key = Vec::with_capacity(raw.len() + 2);
    push_str(&mut key, raw)?;
    Ok(key)
}

pub(crate) fn pair_key(first: &str, second: &str) -> Result<Vec<u8>, LmdbError> {
    let mut key = str_key(first)?;
    push_str(&mut key, second)?;
    Ok(key)
}

pub(crate) fn push_u64(key: &mut Vec<u8>, value: u64) {
    key.extend_from_slice(&value.to_be_bytes());
}

/// Smallest key strictly greater than every key starting with `prefix`, or
/// `None` when no such key exists.
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

/// Owned `(key, value)` pairs with keys in `[lower, end of prefix)`.
///
/// `lower` must itself start with `prefix`.
pub(crate) fn scan_from(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    prefix: &[u8],
    lower: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
    let upper = prefix_upper_bound(prefix);
    let bounds = (
        Bound::Included(lower),
        match &upper {
            Some(upper) => Bound::Excluded(upper.as_slice()),
            None => Bound::Unbounded,
        },
    );
    let mut rows = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (key, val) = result?;
        rows.push((key.to_vec(), val.to_vec()));
    }
    Ok(rows)
}

pub(crate) fn scan_prefix(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
    scan_from(db, txn, prefix, prefix)
}

pub(crate) fn read_u64(bytes: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = bytes.get(bytes.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}
