#![forbid(unsafe_code)]

//! Row decoding for packed and unpacked pixel data.
//!
//! ## Packed Rows
//!
//! Every packed row starts on a word boundary with a small header giving the
//! number of words until the next row (minus 2). For 8 and 16 bits per pixel
//! the header is 6 ignored bits then a 10-bit offset, otherwise it's just an
//! 8-bit offset. After that come packets, each starting with a 2-bit tag:
//!
//! * `00`: End of line. The rest of the row stays transparent.
//! * `01`: Literal. A 6-bit count (plus one), then that many pixel values.
//! * `10`: Transparent. A 6-bit count (plus one) of transparent pixels.
//! * `11`: Repeat. A 6-bit count (plus one), then one pixel value to repeat.
//!
//! The row ends at the end-of-line packet, when the row is full, or when the
//! cursor reaches the next row's word, whichever happens first. The reader is
//! then moved to the next row's word no matter where the packets left it, so
//! padding between rows is skipped.
//!
//! If the data runs out partway through a row, the row stops at the last
//! value that was fully present. Pixels after that are never passed out.
//!
//! ## Unpacked Rows
//!
//! Unpacked rows are just `width` values of `bits_per_pixel` each, with rows a
//! fixed number of bits apart.

use crate::bit_reader::BitReader;

/// The most packets a row of `width` pixels may hold before it's abandoned.
///
/// Every packet but the last one covers at least one pixel, so a well formed
/// row never gets near this.
#[inline]
#[must_use]
pub const fn max_packets_per_row(width: usize) -> usize {
  width.saturating_add(1)
}

/// One packet of a packed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketOp {
  /// End of the row.
  EndOfLine,
  /// `count` raw values follow the packet header.
  Literal { count: u32 },
  /// `count` transparent pixels.
  Transparent { count: u32 },
  /// `count` copies of `value`.
  Repeat { count: u32, value: u16 },
}
impl PacketOp {
  /// Reads one packet header from the reader.
  ///
  /// For [`PacketOp::Literal`] the values are *not* read, the caller must
  /// read `count` values itself. Gives `None` if the packet runs past the end
  /// of the data.
  #[inline]
  pub fn read(r: &mut BitReader<'_>, bits_per_pixel: u8) -> Option<Self> {
    Some(match r.read_bits_checked(2)? {
      0b00 => Self::EndOfLine,
      0b01 => Self::Literal { count: r.read_bits_checked(6)? + 1 },
      0b10 => Self::Transparent { count: r.read_bits_checked(6)? + 1 },
      _ => {
        let count = r.read_bits_checked(6)? + 1;
        let value = r.read_bits_checked(u32::from(bits_per_pixel))? as u16;
        Self::Repeat { count, value }
      }
    })
  }
}

/// How a row's decoding went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RowOutcome {
  /// Pixels the row's packets covered, opaque or transparent.
  pub produced: usize,
  /// The reader ran out of data during this row.
  pub truncated: bool,
  /// The row hit [`max_packets_per_row`] and was abandoned.
  pub packet_limit: bool,
}

/// Decodes one packed row.
///
/// `put(x, value)` is called for each pixel a packet covers, with `None` for
/// transparent pixels. Pixels past `width` are never passed out. Pixels that no
/// packet covers are not passed out at all, they keep whatever default the
/// caller gave them.
pub fn decode_packed_row<F>(
  r: &mut BitReader<'_>, bits_per_pixel: u8, width: usize, put: F,
) -> RowOutcome
where
  F: FnMut(usize, Option<u16>),
{
  decode_packed_row_limited(r, bits_per_pixel, width, max_packets_per_row(width), put)
}

pub(crate) fn decode_packed_row_limited<F>(
  r: &mut BitReader<'_>, bits_per_pixel: u8, width: usize, max_packets: usize, mut put: F,
) -> RowOutcome
where
  F: FnMut(usize, Option<u16>),
{
  let bpp = u32::from(bits_per_pixel);
  let was_overran = r.overran();
  r.align_to_word();
  let row_word = r.current_word_position();
  let offset = if bits_per_pixel >= 8 {
    r.skip_bits(6);
    r.read_bits(10)
  } else {
    r.read_bits(8)
  };
  let next_row_word = row_word.saturating_add(offset as usize + 2);
  let next_row_bit = next_row_word.saturating_mul(32);

  let mut out = RowOutcome::default();
  let mut packets = 0_usize;
  'packets: while out.produced < width && r.bit_position() < next_row_bit {
    if packets >= max_packets {
      out.packet_limit = true;
      break;
    }
    packets += 1;
    let room = (width - out.produced) as u32;
    let Some(op) = PacketOp::read(r, bits_per_pixel) else { break };
    match op {
      PacketOp::EndOfLine => break,
      PacketOp::Literal { count } => {
        for _ in 0..count.min(room) {
          let Some(value) = r.read_bits_checked(bpp) else { break 'packets };
          put(out.produced, Some(value as u16));
          out.produced += 1;
        }
      }
      PacketOp::Transparent { count } => {
        for _ in 0..count.min(room) {
          put(out.produced, None);
          out.produced += 1;
        }
      }
      PacketOp::Repeat { count, value } => {
        for _ in 0..count.min(room) {
          put(out.produced, Some(value));
          out.produced += 1;
        }
      }
    }
  }
  out.truncated = r.overran() && !was_overran;
  r.seek_to_word(next_row_word);
  out
}

/// Decodes one unpacked row starting at bit `row_start_bit`.
///
/// Every pixel of the row is passed out, up to the first value that isn't
/// fully present. The reader is left just after the last value read.
pub fn decode_unpacked_row<F>(
  r: &mut BitReader<'_>, row_start_bit: usize, bits_per_pixel: u8, width: usize, mut put: F,
) -> RowOutcome
where
  F: FnMut(usize, Option<u16>),
{
  let bpp = u32::from(bits_per_pixel);
  let was_overran = r.overran();
  r.seek_to_bit(row_start_bit);
  let mut produced = 0;
  for x in 0..width {
    let Some(value) = r.read_bits_checked(bpp) else { break };
    put(x, Some(value as u16));
    produced += 1;
  }
  RowOutcome { produced, truncated: r.overran() && !was_overran, packet_limit: false }
}

/// Finds the widest row of packed data with no declared width.
///
/// Runs the packet grammar over `height` rows with no width limit (other than
/// `max_width`) and returns the most pixels any row produced.
#[must_use]
pub fn measure_packed_width(
  data: &[u8], bits_per_pixel: u8, height: usize, max_width: usize,
) -> usize {
  let mut r = BitReader::new(data);
  let mut widest = 0;
  for _ in 0..height {
    if !r.has_more_data() {
      break;
    }
    let row = decode_packed_row(&mut r, bits_per_pixel, max_width, |_, _| ());
    widest = widest.max(row.produced);
  }
  widest
}
