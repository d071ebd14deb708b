#![forbid(unsafe_code)]

//! Palette lookup tables (`PLUT` chunks).

use alloc::vec::Vec;
use pixel_formats::r8g8b8a8_Srgb;

use crate::{
  color::{rgb555_to_rgba, scale_channel},
  util::{u16_be_at, u32_be_at},
  CelError, CelResult,
};

/// How the entries of a `PLUT` payload are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteEncoding {
  /// Big-endian 16-bit words, `PRRRRRGGGGGBBBBB`.
  Rgb555,
  /// Three bytes per entry.
  Rgb888,
}
impl PaletteEncoding {
  /// Guesses the encoding from the payload after the entry count.
  ///
  /// When the entry bytes are exactly three per entry, they're RGB triples.
  /// Anything else is read as 16-bit words.
  #[inline]
  #[must_use]
  pub const fn detect(count: usize, entry_bytes: usize) -> Self {
    if count > 0 && entry_bytes == count * 3 {
      Self::Rgb888
    } else {
      Self::Rgb555
    }
  }
}

/// A list of opaque colors, each with the P-mode bit of its entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
  colors: Vec<r8g8b8a8_Srgb>,
  pmode: Vec<bool>,
}
impl Palette {
  /// Makes a palette from colors. All P-mode bits are clear.
  pub fn from_colors(colors: Vec<r8g8b8a8_Srgb>) -> Self {
    let pmode = alloc::vec![false; colors.len()];
    Self { colors, pmode }
  }

  /// An even ramp from black to white, used when a coded cel has no palette.
  pub fn grayscale(len: usize) -> CelResult<Self> {
    let mut colors = Vec::new();
    colors.try_reserve(len)?;
    let max = len.saturating_sub(1).max(1) as u32;
    for i in 0..len {
      let y = scale_channel((i as u32).min(max), max);
      colors.push(r8g8b8a8_Srgb { r: y, g: y, b: y, a: 0xFF });
    }
    Ok(Self::from_colors(colors))
  }

  /// Parses the payload of a `PLUT` chunk.
  ///
  /// The payload is a big-endian entry count, then the entries. Entries that
  /// would run past the end of the payload are dropped.
  ///
  /// * `encoding` forces an entry layout, or `None` to detect it.
  pub fn from_plut_payload(
    payload: &[u8], encoding: Option<PaletteEncoding>,
  ) -> CelResult<Self> {
    let count = u32_be_at(payload, 0).ok_or(CelError::InsufficientBytes)?;
    let count = usize::try_from(count)?;
    let entries = &payload[4..];
    let encoding = encoding.unwrap_or(PaletteEncoding::detect(count, entries.len()));
    let fit = match encoding {
      PaletteEncoding::Rgb555 => entries.len() / 2,
      PaletteEncoding::Rgb888 => entries.len() / 3,
    };
    if fit < count {
      log::warn!("palette declares {count} entries but only {fit} are present");
    }
    let len = count.min(fit);
    let mut colors = Vec::new();
    colors.try_reserve(len)?;
    let mut pmode = Vec::new();
    pmode.try_reserve(len)?;
    match encoding {
      PaletteEncoding::Rgb555 => {
        for i in 0..len {
          let w = u16_be_at(entries, i * 2).unwrap_or(0);
          colors.push(rgb555_to_rgba(w));
          pmode.push(w & 0x8000 != 0);
        }
      }
      PaletteEncoding::Rgb888 => {
        for rgb in entries.chunks_exact(3).take(len) {
          colors.push(r8g8b8a8_Srgb { r: rgb[0], g: rgb[1], b: rgb[2], a: 0xFF });
          pmode.push(false);
        }
      }
    }
    log::trace!("palette: {len} entries, {encoding:?}");
    Ok(Self { colors, pmode })
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.colors.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }

  #[inline]
  #[must_use]
  pub fn colors(&self) -> &[r8g8b8a8_Srgb] {
    &self.colors
  }

  /// The color for an index, wrapping indexes past the end.
  ///
  /// `None` only when the palette is empty.
  #[inline]
  #[must_use]
  pub fn get_wrapping(&self, index: usize) -> Option<r8g8b8a8_Srgb> {
    if self.colors.is_empty() {
      None
    } else {
      Some(self.colors[index % self.colors.len()])
    }
  }

  /// The P-mode bit of an entry, wrapping like [`get_wrapping`](Self::get_wrapping).
  #[inline]
  #[must_use]
  pub fn pmode_bit_wrapping(&self, index: usize) -> bool {
    if self.pmode.is_empty() {
      false
    } else {
      self.pmode[index % self.pmode.len()]
    }
  }
}
