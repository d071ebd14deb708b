#![forbid(unsafe_code)]

//! A most-significant-bit-first cursor over pixel data bytes.
//!
//! CEL pixel data is a stream of big-endian 32-bit words, and fields are
//! pulled from the high bits down. Rows always begin on a word boundary, so
//! the reader also knows how to align to and seek between words.
//!
//! Reading past the end of the buffer never panics: the missing bits read as
//! zero, and [`has_more_data`](BitReader::has_more_data) reports `false` from
//! then on. Zero bits decode as the end-of-line packet, so a truncated row
//! winds down on its own.

/// A bit cursor over a byte slice.
#[derive(Clone, Copy)]
pub struct BitReader<'b> {
  bytes: &'b [u8],
  bit_pos: usize,
  overran: bool,
}

impl core::fmt::Debug for BitReader<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let byte = self.bytes.get(self.bit_pos / 8).copied();
    f.debug_struct("BitReader")
      .field("len", &self.bytes.len())
      .field("word", &self.current_word_position())
      .field("bit", &(self.bit_pos % 32))
      .field("next_byte", &byte.map(|b| b >> (self.bit_pos % 8)))
      .field("overran", &self.overran)
      .finish()
  }
}

impl<'b> BitReader<'b> {
  /// Makes a reader positioned at the first bit of `bytes`.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    Self { bytes, bit_pos: 0, overran: false }
  }

  /// Reads the next `count` bits, high bit first.
  ///
  /// Bits past the end of the buffer are read as 0. The format never uses
  /// fields wider than 16 bits, but up to 32 works.
  #[inline]
  pub fn read_bits(&mut self, count: u32) -> u32 {
    debug_assert!(count <= 32);
    let mut out = 0_u32;
    let mut remaining = count.min(32);
    while remaining > 0 {
      let used_in_byte = (self.bit_pos % 8) as u32;
      let available = 8 - used_in_byte;
      let take = available.min(remaining);
      let byte = match self.bytes.get(self.bit_pos / 8) {
        Some(b) => u32::from(*b),
        None => {
          self.overran = true;
          0
        }
      };
      let bits = (byte >> (available - take)) & ((1 << take) - 1);
      out = (out << take) | bits;
      remaining -= take;
      self.bit_pos = self.bit_pos.saturating_add(take as usize);
    }
    out
  }

  /// Reads the next `count` bits, or `None` if any of them are past the end of
  /// the buffer.
  ///
  /// The cursor moves either way, and an incomplete read still counts for
  /// [`overran`](Self::overran).
  #[inline]
  pub fn read_bits_checked(&mut self, count: u32) -> Option<u32> {
    let complete = self.bit_pos.saturating_add(count as usize) <= self.bit_len();
    let bits = self.read_bits(count);
    complete.then_some(bits)
  }

  /// Reads a single bit.
  #[inline]
  pub fn read_bit(&mut self) -> bool {
    self.read_bits(1) != 0
  }

  /// Moves forward `count` bits without looking at them.
  #[inline]
  pub fn skip_bits(&mut self, count: u32) {
    self.bit_pos = self.bit_pos.saturating_add(count as usize);
    if self.bit_pos > self.bit_len() {
      self.overran = true;
    }
  }

  /// Moves to the start of the next 32-bit word, unless already on one.
  #[inline]
  pub fn align_to_word(&mut self) {
    let rem = self.bit_pos % 32;
    if rem != 0 {
      self.bit_pos = self.bit_pos.saturating_add(32 - rem);
    }
  }

  /// Moves to the start of word `word`, counted from the start of the buffer.
  ///
  /// Seeking backwards is allowed.
  #[inline]
  pub fn seek_to_word(&mut self, word: usize) {
    self.bit_pos = word.saturating_mul(32);
  }

  /// Moves to absolute bit `bit`.
  #[inline]
  pub fn seek_to_bit(&mut self, bit: usize) {
    self.bit_pos = bit;
  }

  /// The index of the word that holds the next unread bit.
  #[inline]
  #[must_use]
  pub const fn current_word_position(&self) -> usize {
    self.bit_pos / 32
  }

  /// The absolute bit position of the cursor.
  #[inline]
  #[must_use]
  pub const fn bit_position(&self) -> usize {
    self.bit_pos
  }

  /// If there's at least one unread bit left in the buffer.
  #[inline]
  #[must_use]
  pub fn has_more_data(&self) -> bool {
    self.bit_pos < self.bit_len()
  }

  /// If any read so far went past the end of the buffer.
  #[inline]
  #[must_use]
  pub const fn overran(&self) -> bool {
    self.overran
  }

  /// The next 32 bits, without moving the cursor.
  #[inline]
  #[must_use]
  pub fn peek_word(&self) -> u32 {
    let mut copy = *self;
    copy.read_bits(32)
  }

  #[inline]
  fn bit_len(&self) -> usize {
    self.bytes.len().saturating_mul(8)
  }
}
