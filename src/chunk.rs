#![forbid(unsafe_code)]

//! The tagged chunk layer shared by cel, animation, and image files.
//!
//! Each chunk is a 4 byte ASCII tag, a big-endian `u32` size that *includes*
//! the 8 bytes of tag and size, and then the payload.

use core::fmt::{Debug, Write};

use crate::util::u32_be_at;

/// Bytes of tag and size in front of every payload.
pub const CHUNK_HEAD_LEN: usize = 8;

/// A chunk's 4 byte tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkTag(pub [u8; 4]);
impl ChunkTag {
  /// Cel header.
  pub const CCB: Self = Self(*b"CCB ");
  /// Palette.
  pub const PLUT: Self = Self(*b"PLUT");
  /// Pixel data.
  pub const PDAT: Self = Self(*b"PDAT");
  /// Animation wrapper.
  pub const ANIM: Self = Self(*b"ANIM");
  /// Static image header.
  pub const IMAG: Self = Self(*b"IMAG");
}
impl Debug for ChunkTag {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      f.write_char(if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })?;
    }
    Ok(())
  }
}

/// An unparsed chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  pub tag: ChunkTag,
  /// Byte offset of the chunk's tag within the file.
  pub offset: usize,
  /// The size field, head included.
  pub declared_size: u32,
  /// The payload. Shorter than the declared size if the file was cut off.
  pub data: &'b [u8],
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("tag", &self.tag)
      .field("offset", &self.offset)
      .field("declared_size", &self.declared_size)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .finish()
  }
}
impl RawChunk<'_> {
  /// Where the chunk says it ends.
  #[inline]
  #[must_use]
  pub const fn declared_end(&self) -> usize {
    self.offset.saturating_add(self.declared_size as usize)
  }
}

/// Produces successive raw chunks from file bytes.
///
/// The scan stops at the end of the bytes, at a chunk whose size is smaller
/// than its own head, or after a chunk that runs past the end of the bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunkIter<'b> {
  bytes: &'b [u8],
  pos: usize,
}
impl<'b> RawChunkIter<'b> {
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    Self { bytes, pos: 0 }
  }

  /// The offset the next chunk will be read from.
  #[inline]
  #[must_use]
  pub const fn position(&self) -> usize {
    self.pos
  }

  /// Continues the scan from `offset` instead.
  #[inline]
  pub fn resume_at(&mut self, offset: usize) {
    self.pos = offset;
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = RawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.pos;
    let tag_bytes: [u8; 4] = self.bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    let tag = ChunkTag(tag_bytes);
    let Some(declared_size) = u32_be_at(self.bytes, offset + 4) else {
      log::warn!("chunk {tag:?} at {offset} has no size field");
      self.pos = self.bytes.len();
      return None;
    };
    if (declared_size as usize) < CHUNK_HEAD_LEN {
      log::warn!("chunk {tag:?} at {offset} declares size {declared_size}, stopping the scan");
      self.pos = self.bytes.len();
      return None;
    }
    let start = offset + CHUNK_HEAD_LEN;
    let end = offset.saturating_add(declared_size as usize);
    let data = if end <= self.bytes.len() {
      self.pos = end;
      &self.bytes[start..end]
    } else {
      log::warn!(
        "chunk {tag:?} at {offset} declares {declared_size} bytes but the file has only {}",
        self.bytes.len() - offset
      );
      self.pos = self.bytes.len();
      &self.bytes[start..]
    };
    log::trace!("chunk {tag:?} at {offset}, {} payload bytes", data.len());
    Some(RawChunk { tag, offset, declared_size, data })
  }
}
