#![forbid(unsafe_code)]

//! The pixel processor: a two-source multiply/divide blend.
//!
//! The 32-bit blend control word holds two 16-bit modes, mode 0 in the low
//! half and mode 1 in the high half. Each mode computes, per channel:
//!
//! ```txt
//! out = clamp255(primary * multiplier / divider + secondary / secondary_divider)
//! ```
//!
//! The "external buffer" the hardware can read from is modelled as a single
//! backdrop color supplied by the caller.
//!
//! When there's no control word the decoder only applies the brightness side
//! channel, scaling by `(brightness + 1) / 8`. That fallback is an
//! approximation and doesn't simulate the hardware.

use bitfrob::{u16_get_bit, u16_get_value};
use pixel_formats::r8g8b8a8_Srgb;

use crate::{color::scale_channel, header::PModeSelect};

/// Where the multiplier comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplierSource {
  /// The mode's own 3-bit constant.
  Constant,
  /// The pixel's brightness side channel.
  Brightness,
  /// Each channel's own top 3 bits.
  ColorDerived,
}

/// What gets added to the scaled primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondarySource {
  Zero,
  /// The mode's own 5-bit constant, for all three channels.
  Constant,
  Backdrop,
  Pixel,
}

/// One 16-bit blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PMode {
  pub raw: u16,
  /// The primary source is the backdrop, not the pixel.
  pub primary_is_backdrop: bool,
  pub multiplier_source: MultiplierSource,
  /// 1 to 8.
  pub multiplier: u8,
  /// 2, 4, 8, or 16.
  pub divider: u8,
  pub secondary_source: SecondarySource,
  /// The 5-bit constant expanded to 8 bits.
  pub secondary_constant: u8,
  pub secondary_halved: bool,
}
impl From<u16> for PMode {
  #[inline]
  fn from(raw: u16) -> Self {
    Self {
      raw,
      primary_is_backdrop: u16_get_bit(15, raw),
      multiplier_source: match u16_get_value(13, 14, raw) {
        0 => MultiplierSource::Constant,
        1 => MultiplierSource::Brightness,
        _ => MultiplierSource::ColorDerived,
      },
      multiplier: u16_get_value(10, 12, raw) as u8 + 1,
      divider: match u16_get_value(8, 9, raw) {
        0 => 16,
        1 => 2,
        2 => 4,
        _ => 8,
      },
      secondary_source: match u16_get_value(6, 7, raw) {
        0 => SecondarySource::Zero,
        1 => SecondarySource::Constant,
        2 => SecondarySource::Backdrop,
        _ => SecondarySource::Pixel,
      },
      secondary_constant: scale_channel(u32::from(u16_get_value(1, 5, raw)), 31),
      secondary_halved: u16_get_bit(0, raw),
    }
  }
}
impl PMode {
  /// Blends one opaque pixel.
  ///
  /// * `brightness` is the pixel's 0 to 7 brightness, if it has one. A
  ///   brightness multiplier without one uses the mode's constant.
  #[must_use]
  pub fn apply(
    &self, pixel: r8g8b8a8_Srgb, brightness: Option<u8>, backdrop: r8g8b8a8_Srgb,
  ) -> r8g8b8a8_Srgb {
    let primary = if self.primary_is_backdrop { backdrop } else { pixel };
    let secondary = match self.secondary_source {
      SecondarySource::Zero => [0; 3],
      SecondarySource::Constant => [self.secondary_constant; 3],
      SecondarySource::Backdrop => [backdrop.r, backdrop.g, backdrop.b],
      SecondarySource::Pixel => [pixel.r, pixel.g, pixel.b],
    };
    let sdiv = if self.secondary_halved { 2 } else { 1 };
    let channel = |p: u8, s: u8| -> u8 {
      let mult = match (self.multiplier_source, brightness) {
        (MultiplierSource::Constant, _) | (MultiplierSource::Brightness, None) => {
          u32::from(self.multiplier)
        }
        (MultiplierSource::Brightness, Some(b)) => u32::from(b & 0b111) + 1,
        (MultiplierSource::ColorDerived, _) => u32::from(p >> 5) + 1,
      };
      let v = u32::from(p) * mult / u32::from(self.divider) + u32::from(s) / sdiv;
      v.min(255) as u8
    };
    r8g8b8a8_Srgb {
      r: channel(primary.r, secondary[0]),
      g: channel(primary.g, secondary[1]),
      b: channel(primary.b, secondary[2]),
      a: 0xFF,
    }
  }
}

/// Both modes of a blend control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendControl {
  pub mode0: PMode,
  pub mode1: PMode,
}
impl From<u32> for BlendControl {
  #[inline]
  fn from(raw: u32) -> Self {
    Self { mode0: PMode::from(raw as u16), mode1: PMode::from((raw >> 16) as u16) }
  }
}
impl BlendControl {
  /// The mode a pixel uses, given the header's selector and the pixel's own
  /// P-mode bit.
  #[inline]
  #[must_use]
  pub const fn select(&self, select: PModeSelect, pmode_bit: bool) -> &PMode {
    match select {
      PModeSelect::Force0 => &self.mode0,
      PModeSelect::Force1 => &self.mode1,
      PModeSelect::PerPixel => {
        if pmode_bit {
          &self.mode1
        } else {
          &self.mode0
        }
      }
    }
  }
}

/// Scales a color by `(brightness + 1) / 8`.
#[inline]
#[must_use]
pub fn brightness_fallback(pixel: r8g8b8a8_Srgb, brightness: u8) -> r8g8b8a8_Srgb {
  let m = u32::from(brightness & 0b111) + 1;
  let f = |c: u8| (u32::from(c) * m / 8) as u8;
  r8g8b8a8_Srgb { r: f(pixel.r), g: f(pixel.g), b: f(pixel.b), a: pixel.a }
}
