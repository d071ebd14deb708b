#![forbid(unsafe_code)]

//! Direct color expansion.
//!
//! Uncoded pixels hold their color in the value itself:
//! * 8 bits per pixel is `RRRGGGBB`.
//! * 16 bits per pixel is `PRRRRRGGGGGBBBBB`, where `P` is the pixel's P-mode
//!   bit and isn't part of the color.
//!
//! Channels are scaled to 8 bits with `v * 255 / max`, so the top value of a
//! channel always becomes 255.

use bitfrob::u8_replicate_bits;
use pixel_formats::r8g8b8a8_Srgb;

/// Scales a channel value in `0..=max` up to `0..=255`.
#[inline]
#[must_use]
pub const fn scale_channel(v: u32, max: u32) -> u8 {
  (v * 255 / max) as u8
}

/// Expands an `RRRGGGBB` value, opaque.
#[inline]
#[must_use]
pub const fn rgb332_to_rgba(v: u8) -> r8g8b8a8_Srgb {
  let v = v as u32;
  r8g8b8a8_Srgb {
    r: scale_channel(v >> 5, 7),
    g: scale_channel((v >> 2) & 0b111, 7),
    b: scale_channel(v & 0b11, 3),
    a: 0xFF,
  }
}

/// Expands an `xRRRRRGGGGGBBBBB` value, opaque. The top bit is ignored.
#[inline]
#[must_use]
pub const fn rgb555_to_rgba(v: u16) -> r8g8b8a8_Srgb {
  let v = v as u32;
  r8g8b8a8_Srgb {
    r: scale_channel((v >> 10) & 0x1F, 31),
    g: scale_channel((v >> 5) & 0x1F, 31),
    b: scale_channel(v & 0x1F, 31),
    a: 0xFF,
  }
}

/// Expands an uncoded pixel value of the given depth into an opaque color.
///
/// Depths other than 8 and 16 have no color layout, those values become a
/// gray level.
#[inline]
#[must_use]
pub fn expand_uncoded(value: u16, bits_per_pixel: u8) -> r8g8b8a8_Srgb {
  match bits_per_pixel {
    16 => rgb555_to_rgba(value),
    8 => rgb332_to_rgba(value as u8),
    bpp => {
      let y = u8_replicate_bits(u32::from(bpp.min(8)), value as u8);
      r8g8b8a8_Srgb { r: y, g: y, b: y, a: 0xFF }
    }
  }
}

/// If a color is pure black, ignoring alpha.
#[inline]
#[must_use]
pub const fn is_black(c: r8g8b8a8_Srgb) -> bool {
  c.r == 0 && c.g == 0 && c.b == 0
}
