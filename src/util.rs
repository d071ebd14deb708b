//! Shorthands for pulling big-endian values off the front of byte slices.

use bytemuck::{pod_read_unaligned, Pod};

use crate::CelError;
use core::mem::size_of;

#[inline]
pub(crate) fn try_pull_pod<T: Pod>(bytes: &[u8]) -> Result<(T, &[u8]), CelError> {
  let position = size_of::<T>();
  if bytes.len() >= position {
    let (head, tail) = bytes.split_at(position);
    let a: T = pod_read_unaligned(head);
    Ok((a, tail))
  } else {
    Err(CelError::InsufficientBytes)
  }
}

/// Reads a big-endian `u32` at `offset`, or `None` if it would go past the end.
#[inline]
#[must_use]
pub(crate) fn u32_be_at(bytes: &[u8], offset: usize) -> Option<u32> {
  let end = offset.checked_add(4)?;
  let a: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
  Some(u32::from_be_bytes(a))
}

/// Reads a big-endian `u16` at `offset`, or `None` if it would go past the end.
#[inline]
#[must_use]
pub(crate) fn u16_be_at(bytes: &[u8], offset: usize) -> Option<u16> {
  let end = offset.checked_add(2)?;
  let a: [u8; 2] = bytes.get(offset..end)?.try_into().ok()?;
  Some(u16::from_be_bytes(a))
}

/// A `Vec` of `len` copies of `value`, with the allocation checked.
#[cfg(feature = "alloc")]
#[inline]
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<alloc::vec::Vec<T>, CelError> {
  let mut v = alloc::vec::Vec::new();
  v.try_reserve(len)?;
  v.resize(len, value);
  Ok(v)
}
