#![forbid(unsafe_code)]

//! Storage order correction and half-resolution expansion.
//!
//! Some images store their pixels in 2x2 blocks: each run of four sequential
//! values fills one block, and the blocks go left to right then top to bottom.
//! Others are stored at half width and/or half height and must be stretched
//! back out after decoding.

use alloc::vec::Vec;

use crate::{decode::DecodedImage, decode::PixelData, CelError, CelResult};

/// How stored pixels map onto the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelOrder {
  /// Plain row-major order.
  Linear,
  /// Each 4 values go to `(0,0), (1,0), (0,1), (1,1)` of a block.
  Blocked,
  /// Each 4 values go to `(0,1), (1,1), (0,0), (1,0)` of a block.
  BlockedBottomFirst,
}
impl From<u8> for PixelOrder {
  #[inline]
  fn from(value: u8) -> Self {
    match value {
      1 => Self::Blocked,
      2 => Self::BlockedBottomFirst,
      _ => Self::Linear,
    }
  }
}
impl PixelOrder {
  #[inline]
  const fn block_offsets(self) -> Option<[(usize, usize); 4]> {
    match self {
      Self::Linear => None,
      Self::Blocked => Some([(0, 0), (1, 0), (0, 1), (1, 1)]),
      Self::BlockedBottomFirst => Some([(0, 1), (1, 1), (0, 0), (1, 0)]),
    }
  }
}

/// Which axes an image was stored at half resolution on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfResolution {
  Full,
  HalfWidth,
  HalfHeight,
  HalfBoth,
}
impl From<u8> for HalfResolution {
  #[inline]
  fn from(value: u8) -> Self {
    match value {
      1 => Self::HalfWidth,
      2 => Self::HalfHeight,
      3 => Self::HalfBoth,
      _ => Self::Full,
    }
  }
}
impl HalfResolution {
  /// The stored size of an image with the given full size. Odd sizes round up.
  #[inline]
  #[must_use]
  pub const fn stored_dimensions(self, width: u32, height: u32) -> (u32, u32) {
    match self {
      Self::Full => (width, height),
      Self::HalfWidth => (width.div_ceil(2), height),
      Self::HalfHeight => (width, height.div_ceil(2)),
      Self::HalfBoth => (width.div_ceil(2), height.div_ceil(2)),
    }
  }
}

/// Moves sequentially stored values into their 2x2 blocks.
///
/// When the width or height is odd, the last column or row isn't covered by
/// any block. The values after the last full block fill those spots in
/// row-major order.
pub fn reorder_blocks<T: Copy>(
  src: &[T], width: usize, height: usize, order: PixelOrder,
) -> CelResult<Vec<T>> {
  let mut out = Vec::new();
  out.try_reserve(src.len())?;
  out.extend_from_slice(src);
  let Some(offsets) = order.block_offsets() else { return Ok(out) };
  if src.len() != width.checked_mul(height).ok_or(CelError::CheckedMath)? {
    return Err(CelError::CheckedMath);
  }
  let blocks_across = width / 2;
  let blocks_down = height / 2;
  let block_count = blocks_across * blocks_down;
  for (k, group) in src.chunks_exact(4).take(block_count).enumerate() {
    let bx = (k % blocks_across) * 2;
    let by = (k / blocks_across) * 2;
    for (v, (dx, dy)) in group.iter().zip(offsets) {
      out[(by + dy) * width + bx + dx] = *v;
    }
  }
  let mut leftovers = src[block_count * 4..].iter();
  for y in 0..height {
    for x in 0..width {
      if x >= blocks_across * 2 || y >= blocks_down * 2 {
        if let Some(v) = leftovers.next() {
          out[y * width + x] = *v;
        }
      }
    }
  }
  Ok(out)
}

/// Nearest-neighbour stretch from `src_w * src_h` to `dst_w * dst_h`.
pub fn upscale_nearest<T: Copy>(
  src: &[T], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize,
) -> CelResult<Vec<T>> {
  let count = dst_w.checked_mul(dst_h).ok_or(CelError::CheckedMath)?;
  if src.len() != src_w.checked_mul(src_h).ok_or(CelError::CheckedMath)? || src.is_empty() {
    return Err(CelError::WidthOrHeightZero);
  }
  let mut out = Vec::new();
  out.try_reserve(count)?;
  for y in 0..dst_h {
    let sy = y * src_h / dst_h;
    for x in 0..dst_w {
      let sx = x * src_w / dst_w;
      out.push(src[sy * src_w + sx]);
    }
  }
  Ok(out)
}

impl DecodedImage {
  /// Applies a pixel order to the image and all of its side channels.
  pub fn reordered(mut self, order: PixelOrder) -> CelResult<Self> {
    if order == PixelOrder::Linear {
      return Ok(self);
    }
    let (w, h) = (self.width as usize, self.height as usize);
    self.pixels = match &self.pixels {
      PixelData::Values(v) => PixelData::Values(reorder_blocks(v, w, h, order)?),
      PixelData::Rgba(v) => PixelData::Rgba(reorder_blocks(v, w, h, order)?),
    };
    if let Some(t) = &self.transparency {
      self.transparency = Some(reorder_blocks(t, w, h, order)?);
    }
    if let Some(b) = &self.brightness {
      self.brightness = Some(reorder_blocks(b, w, h, order)?);
    }
    if let Some(p) = &self.pmode_bits {
      self.pmode_bits = Some(reorder_blocks(p, w, h, order)?);
    }
    Ok(self)
  }

  /// Stretches the image and all of its side channels to a new size.
  pub fn upscaled(mut self, width: u32, height: u32) -> CelResult<Self> {
    if width == self.width && height == self.height {
      return Ok(self);
    }
    if width == 0 || height == 0 {
      return Err(CelError::WidthOrHeightZero);
    }
    let (sw, sh) = (self.width as usize, self.height as usize);
    let (dw, dh) = (width as usize, height as usize);
    self.pixels = match &self.pixels {
      PixelData::Values(v) => PixelData::Values(upscale_nearest(v, sw, sh, dw, dh)?),
      PixelData::Rgba(v) => PixelData::Rgba(upscale_nearest(v, sw, sh, dw, dh)?),
    };
    if let Some(t) = &self.transparency {
      self.transparency = Some(upscale_nearest(t, sw, sh, dw, dh)?);
    }
    if let Some(b) = &self.brightness {
      self.brightness = Some(upscale_nearest(b, sw, sh, dw, dh)?);
    }
    if let Some(p) = &self.pmode_bits {
      self.pmode_bits = Some(upscale_nearest(p, sw, sh, dw, dh)?);
    }
    self.width = width;
    self.height = height;
    Ok(self)
  }
}
