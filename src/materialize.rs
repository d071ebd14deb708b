#![forbid(unsafe_code)]

//! Turns a [`DecodedImage`] into a color raster.

use alloc::vec::Vec;
use pixel_formats::r8g8b8a8_Srgb;

use crate::{
  blend::{brightness_fallback, BlendControl},
  color::is_black,
  decode::{BlendOptions, DecodeOptions, DecodedImage, PixelData},
  image::{Bitmap, Palmap},
  palette::Palette,
  CelResult,
};

/// Entries in the ramp used for coded cels that have no palette at all.
const MISSING_PALETTE_LEN: usize = 32;

const CLEAR: r8g8b8a8_Srgb = r8g8b8a8_Srgb { r: 0, g: 0, b: 0, a: 0 };

impl DecodedImage {
  /// Builds the final RGBA raster with the blend settings of `options`.
  #[inline]
  pub fn materialize_with(&self, options: &DecodeOptions) -> CelResult<Bitmap<r8g8b8a8_Srgb>> {
    self.materialize(&options.blend)
  }

  /// Builds the final RGBA raster.
  ///
  /// Transparent pixels are `(0,0,0,0)`, and every other pixel has alpha
  /// 255. For coded cels a palette entry of exact black is also transparent,
  /// unless the header's background-pass flag is set.
  pub fn materialize(&self, blend: &BlendOptions) -> CelResult<Bitmap<r8g8b8a8_Srgb>> {
    let ramp;
    let palette = match &self.palette {
      Some(p) if !p.is_empty() => p,
      _ => {
        ramp = Palette::grayscale(MISSING_PALETTE_LEN)?;
        &ramp
      }
    };
    let control = self.blend_control.map(BlendControl::from);
    let count = self.pixel_count();

    let mut pixels = Vec::new();
    pixels.try_reserve(count)?;
    for i in 0..count {
      if self.is_transparent(i) {
        pixels.push(CLEAR);
        continue;
      }
      let (color, entry_pmode) = match &self.pixels {
        PixelData::Values(v) => {
          let index = usize::from(v[i]);
          let color = palette.get_wrapping(index).unwrap_or(CLEAR);
          if is_black(color) && !self.flags.background_pass {
            pixels.push(CLEAR);
            continue;
          }
          (color, palette.pmode_bit_wrapping(index))
        }
        PixelData::Rgba(v) => (v[i], false),
      };
      let brightness = self.brightness.as_ref().map(|b| b[i]);
      let out = if !blend.enabled {
        color
      } else if let Some(control) = &control {
        let pmode_bit = self.pmode_bits.as_ref().map_or(entry_pmode, |p| p[i]);
        control.select(self.flags.pmode_select, pmode_bit).apply(color, brightness, blend.backdrop)
      } else if let Some(b) = brightness {
        brightness_fallback(color, b)
      } else {
        color
      };
      pixels.push(r8g8b8a8_Srgb { a: 0xFF, ..out });
    }
    Ok(Bitmap { width: self.width, height: self.height, pixels })
  }

  /// The palette indexes and palette of a coded cel, or `None` for an
  /// uncoded one.
  ///
  /// The transparency mask includes pixels whose palette entry is black,
  /// following the same rule as [`materialize`](Self::materialize).
  pub fn to_palmap(&self) -> CelResult<Option<Palmap<u16, r8g8b8a8_Srgb>>> {
    let PixelData::Values(values) = &self.pixels else { return Ok(None) };
    let palette = match &self.palette {
      Some(p) if !p.is_empty() => p.clone(),
      _ => Palette::grayscale(MISSING_PALETTE_LEN)?,
    };
    let mut indexes = Vec::new();
    indexes.try_reserve(values.len())?;
    indexes.extend_from_slice(values);
    let mut mask = Vec::new();
    mask.try_reserve(values.len())?;
    for (i, v) in values.iter().enumerate() {
      let black = !self.flags.background_pass
        && palette.get_wrapping(usize::from(*v)).map_or(false, is_black);
      mask.push(self.is_transparent(i) || black);
    }
    let transparency = if mask.iter().any(|t| *t) { Some(mask) } else { None };
    let mut colors = Vec::new();
    colors.try_reserve(palette.len())?;
    colors.extend_from_slice(palette.colors());
    Ok(Some(Palmap {
      width: self.width,
      height: self.height,
      indexes,
      palette: colors,
      transparency,
    }))
  }
}
