#![forbid(unsafe_code)]

//! Heap-allocated raster types handed to image sinks.

use alloc::vec::Vec;
use pixel_formats::r8g8b8a8_Srgb;

use crate::CelResult;

/// Converts an `(x,y)` position within a `width` wide raster into a linear
/// index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  y as usize * width as usize + x as usize
}

/// A direct-color image, rows top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub struct Bitmap<P> {
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<P>,
}
impl<P> Bitmap<P> {
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<&P> {
    if x < self.width && y < self.height {
      self.pixels.get(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  #[inline]
  #[must_use]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut P> {
    if x < self.width && y < self.height {
      self.pixels.get_mut(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  /// Iterates the rows of the image.
  #[inline]
  pub fn rows(&self) -> core::slice::ChunksExact<'_, P> {
    self.pixels.chunks_exact((self.width as usize).max(1))
  }
}

/// An indexed-color image.
///
/// Indexes past the end of the palette wrap around to the start.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub struct Palmap<I, P> {
  pub width: u32,
  pub height: u32,
  pub indexes: Vec<I>,
  pub palette: Vec<P>,
  /// `true` for transparent pixels, `None` when all pixels are opaque.
  pub transparency: Option<Vec<bool>>,
}
impl<I, P> Palmap<I, P> {
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<&I> {
    if x < self.width && y < self.height {
      self.indexes.get(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  #[inline]
  #[must_use]
  pub fn is_transparent(&self, x: u32, y: u32) -> bool {
    let i = xy_width_to_index(x, y, self.width);
    self.transparency.as_ref().and_then(|t| t.get(i).copied()).unwrap_or(false)
  }
}
impl<I> Palmap<I, r8g8b8a8_Srgb>
where
  I: Copy + Into<usize>,
{
  /// Looks every index up in the palette. Transparent pixels get alpha 0.
  pub fn to_bitmap(&self) -> CelResult<Bitmap<r8g8b8a8_Srgb>> {
    let mut pixels = Vec::new();
    pixels.try_reserve(self.indexes.len())?;
    for (n, i) in self.indexes.iter().enumerate() {
      let transparent = self.transparency.as_ref().and_then(|t| t.get(n).copied()).unwrap_or(false);
      let color = if self.palette.is_empty() {
        r8g8b8a8_Srgb::default()
      } else {
        self.palette[(*i).into() % self.palette.len()]
      };
      pixels.push(if transparent { r8g8b8a8_Srgb { a: 0, ..color } } else { color });
    }
    Ok(Bitmap { width: self.width, height: self.height, pixels })
  }
}
