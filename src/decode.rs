#![forbid(unsafe_code)]

//! Decoding one cel: a header, an optional palette, and pixel data.

use alloc::vec::Vec;
use pixel_formats::r8g8b8a8_Srgb;

use crate::{
  bit_reader::BitReader,
  color::expand_uncoded,
  format::{detect_format, CelFormat, FormatOverrides, MAX_DIMENSION},
  header::{CcbFlags, CelHeader},
  packet::{decode_packed_row, decode_unpacked_row, measure_packed_width},
  palette::{Palette, PaletteEncoding},
  util::try_filled,
  CelError, CelResult,
};

/// Settings for the blend stage of materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendOptions {
  /// Run the blend stage at all. When this is off, colors come straight from
  /// the palette or the expanded direct color.
  pub enabled: bool,
  /// Stands in for the frame buffer the cel would have been drawn over.
  pub backdrop: r8g8b8a8_Srgb,
}
impl Default for BlendOptions {
  #[inline]
  fn default() -> Self {
    Self { enabled: true, backdrop: r8g8b8a8_Srgb { r: 0, g: 0, b: 0, a: 0xFF } }
  }
}

/// Caller configuration for decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
  pub overrides: FormatOverrides,
  /// Used by coded cels that have no palette chunk of their own.
  pub fallback_palette: Option<Palette>,
  /// Forces the entry layout of palette chunks.
  pub palette_encoding: Option<PaletteEncoding>,
  /// Used by [`DecodedImage::materialize_with`].
  pub blend: BlendOptions,
}

/// The pixel values of a decoded cel.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
  /// One value per pixel. For coded cels this is the palette index.
  Values(Vec<u16>),
  /// Direct color, after uncoded values were expanded.
  Rgba(Vec<r8g8b8a8_Srgb>),
}
impl PixelData {
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::Values(v) => v.len(),
      Self::Rgba(v) => v.len(),
    }
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A single decoded cel.
///
/// Every side channel that is present has exactly `width * height` entries,
/// in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
  pub width: u32,
  pub height: u32,
  pub format: CelFormat,
  pub pixels: PixelData,
  /// `true` for transparent pixels. `None` means every pixel is opaque.
  pub transparency: Option<Vec<bool>>,
  /// The 0 to 7 brightness of each pixel, for 8-bit coded cels.
  pub brightness: Option<Vec<u8>>,
  /// Each pixel's own P-mode bit, for formats that store one in the value.
  pub pmode_bits: Option<Vec<bool>>,
  /// The palette for coded cels.
  pub palette: Option<Palette>,
  pub flags: CcbFlags,
  /// The blend control word, when the header loads one.
  pub blend_control: Option<u32>,
  /// The pixel data ended before the last row did. Pixels past that point are
  /// transparent.
  pub truncated: bool,
}
impl DecodedImage {
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> u8 {
    self.format.bits_per_pixel
  }

  #[inline]
  #[must_use]
  pub fn pixel_count(&self) -> usize {
    self.pixels.len()
  }

  /// If the pixel at row-major index `i` is transparent.
  #[inline]
  #[must_use]
  pub fn is_transparent(&self, i: usize) -> bool {
    self.transparency.as_ref().and_then(|t| t.get(i).copied()).unwrap_or(false)
  }
}

/// How the rows of pixel data are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowLayout {
  Packed,
  /// Rows start every `stride_bits` bits.
  Unpacked { stride_bits: usize },
}

/// Decodes a cel.
///
/// * `palette` is the cel's own palette, if the container had one for it.
/// * `pixel_data` is the `PDAT` payload, possibly starting with a preamble.
///
/// ## Failure
/// Anything [`detect_format`] fails with, plus [`CelError::AllocError`]. A
/// packed cel whose rows produce no pixels at all is
/// [`CelError::WidthOrHeightZero`].
pub fn decode_cel(
  header: &CelHeader, palette: Option<&Palette>, pixel_data: &[u8], options: &DecodeOptions,
) -> CelResult<DecodedImage> {
  let resolved = detect_format(header, pixel_data, &options.overrides)?;
  let data = pixel_data.get(resolved.data_offset..).unwrap_or(&[]);
  let format = resolved.format;
  let bpp = format.bits_per_pixel;

  let width = match resolved.width {
    Some(w) => w,
    None => {
      let w = measure_packed_width(data, bpp, resolved.height as usize, MAX_DIMENSION as usize);
      log::debug!("measured packed width: {w}");
      u32::try_from(w)?
    }
  };
  if width == 0 {
    return Err(CelError::WidthOrHeightZero);
  }

  let layout = if format.packed {
    RowLayout::Packed
  } else {
    let words = resolved.row_stride_words.unwrap_or_else(|| (width * u32::from(bpp)).div_ceil(32));
    RowLayout::Unpacked { stride_bits: words as usize * 32 }
  };

  let mut image = decode_rows(data, format, width, resolved.height, layout, header.flags)?;
  image.blend_control = header.blend_control();
  if format.coded {
    image.palette = palette.cloned().or_else(|| options.fallback_palette.clone());
    if image.palette.is_none() {
      log::debug!("coded cel has no palette");
    }
  }
  Ok(image)
}

/// The meaning of one raw pixel value.
#[derive(Debug, Clone, Copy, Default)]
struct PixelMeaning {
  value: u16,
  transparent: bool,
  brightness: u8,
  pmode: bool,
}

#[inline]
fn interpret(format: CelFormat, flags: &CcbFlags, raw: u16) -> PixelMeaning {
  let bpp = format.bits_per_pixel;
  if format.coded {
    match bpp {
      8 => PixelMeaning {
        value: raw & 0x1F,
        brightness: (raw >> 5) as u8 & 0b111,
        ..Default::default()
      },
      6 => PixelMeaning { value: raw & 0x1F, pmode: raw & (1 << 5) != 0, ..Default::default() },
      16 => PixelMeaning { value: raw & 0x1F, pmode: raw & 0x8000 != 0, ..Default::default() },
      _ => {
        let prefix = u16::from(flags.palette_extension) << bpp;
        PixelMeaning { value: (prefix | raw) & 0x1F, ..Default::default() }
      }
    }
  } else if raw == 0 && !flags.background_pass {
    PixelMeaning { transparent: true, ..Default::default() }
  } else {
    let value = if raw == 0 && !flags.no_black { 1 } else { raw };
    PixelMeaning { value, pmode: bpp == 16 && raw & 0x8000 != 0, ..Default::default() }
  }
}

#[inline]
const fn carries_pmode_bit(format: CelFormat) -> bool {
  match (format.coded, format.bits_per_pixel) {
    (true, 6) | (_, 16) => true,
    _ => false,
  }
}

/// Decodes rows into a fresh image with no palette or blend word.
pub(crate) fn decode_rows(
  data: &[u8], format: CelFormat, width: u32, height: u32, layout: RowLayout, flags: CcbFlags,
) -> CelResult<DecodedImage> {
  let w = width as usize;
  let h = height as usize;
  let count = w.checked_mul(h).ok_or(CelError::CheckedMath)?;
  let bpp = format.bits_per_pixel;

  // pixels no packet or value reaches stay transparent
  let mut values: Vec<u16> = try_filled(count, 0)?;
  let mut mask: Vec<bool> = try_filled(count, true)?;
  let mut brightness =
    if format.coded && bpp == 8 { Some(try_filled(count, 0_u8)?) } else { None };
  let mut pmode = if carries_pmode_bit(format) { Some(try_filled(count, false)?) } else { None };

  let mut r = BitReader::new(data);
  let mut truncated = false;
  for y in 0..h {
    let base = y * w;
    let put = |x: usize, v: Option<u16>| {
      let i = base + x;
      match v {
        None => {
          values[i] = 0;
          mask[i] = true;
        }
        Some(raw) => {
          let m = interpret(format, &flags, raw);
          values[i] = m.value;
          mask[i] = m.transparent;
          if let Some(b) = brightness.as_mut() {
            b[i] = m.brightness;
          }
          if let Some(p) = pmode.as_mut() {
            p[i] = m.pmode;
          }
        }
      }
    };
    let row = match layout {
      RowLayout::Packed => decode_packed_row(&mut r, bpp, w, put),
      RowLayout::Unpacked { stride_bits } => {
        decode_unpacked_row(&mut r, y.saturating_mul(stride_bits), bpp, w, put)
      }
    };
    if row.packet_limit {
      log::warn!("row {y} has too many packets, the rest of it is skipped");
    }
    if row.truncated && !truncated {
      log::warn!("pixel data ends during row {y} of {h}");
      truncated = true;
    }
  }

  let pixels = if format.coded {
    PixelData::Values(values)
  } else {
    let mut rgba = Vec::new();
    rgba.try_reserve(count)?;
    rgba.extend(values.iter().zip(mask.iter()).map(|(v, t)| {
      if *t {
        r8g8b8a8_Srgb::default()
      } else {
        expand_uncoded(*v, bpp)
      }
    }));
    PixelData::Rgba(rgba)
  };
  let transparency = if mask.iter().any(|t| *t) { Some(mask) } else { None };

  Ok(DecodedImage {
    width,
    height,
    format,
    pixels,
    transparency,
    brightness,
    pmode_bits: pmode,
    palette: None,
    flags,
    blend_control: None,
    truncated,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::{ccb_payload, Packet, PackedCelBuilder};
  use alloc::vec;

  const CCBPRE: u32 = 1 << 22;
  const PACKED: u32 = 1 << 9;
  const BGND: u32 = 1 << 5;
  const NOBLK: u32 = 1 << 4;

  fn header(flags: u32, pre0: u32, pre1: u32, w: u32, h: u32) -> CelHeader {
    CelHeader::try_from_payload(&ccb_payload(flags, 0, pre0, pre1, w, h)).unwrap()
  }

  fn values(img: &DecodedImage) -> &[u16] {
    match &img.pixels {
      PixelData::Values(v) => v,
      PixelData::Rgba(_) => panic!("expected values"),
    }
  }

  #[test]
  fn test_packed_coded_8bpp_row() {
    let data = PackedCelBuilder::new(8)
      .row(&[Packet::Literal(vec![5, 9]), Packet::Repeat(3, 7), Packet::Eol])
      .finish();
    let h = header(CCBPRE | PACKED, 5, 0, 5, 1);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!((img.width, img.height), (5, 1));
    assert_eq!(values(&img), &[5, 9, 7, 7, 7]);
    assert_eq!(img.transparency, None);
    assert_eq!(img.brightness, Some(vec![0; 5]));
    assert!(!img.truncated);
  }

  #[test]
  fn test_brightness_side_channel() {
    let data =
      PackedCelBuilder::new(8).row(&[Packet::Literal(vec![(3 << 5) | 4, 0xFF])]).finish();
    let h = header(CCBPRE | PACKED, 5, 0, 2, 1);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!(values(&img), &[4, 31]);
    assert_eq!(img.brightness, Some(vec![3, 7]));
  }

  #[test]
  fn test_transparent_run_and_eol_fill() {
    let data = PackedCelBuilder::new(4)
      .row(&[Packet::Transparent(3), Packet::Repeat(2, 6), Packet::Eol])
      .finish();
    let h = header(CCBPRE | PACKED, 3, 0, 6, 1);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!(img.transparency, Some(vec![true, true, true, false, false, true]));
    assert_eq!(values(&img), &[0, 0, 0, 6, 6, 0]);
  }

  #[test]
  fn test_palette_extension_prefix() {
    let data = PackedCelBuilder::new(2).row(&[Packet::Literal(vec![1, 2]), Packet::Eol]).finish();
    let h = header(CCBPRE | PACKED | 0b0101, 2, 0, 2, 1);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    // 0b0101 prefixed onto two bits, cut to five bits
    assert_eq!(values(&img), &[0b10101, 0b10110]);
  }

  #[test]
  fn test_uncoded_zero_rules() {
    // unpacked uncoded 8bpp, a single row of [0, 0xFF]
    let pre0 = (1 << 4) | 5;
    let data = [0x00, 0xFF, 0, 0];
    let img =
      decode_cel(&header(CCBPRE, pre0, 0, 2, 1), None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!(img.transparency, Some(vec![true, false]));

    let options = DecodeOptions::default();
    let img = decode_cel(&header(CCBPRE | BGND, pre0, 0, 2, 1), None, &data, &options).unwrap();
    assert_eq!(img.transparency, None);
    let PixelData::Rgba(px) = &img.pixels else { panic!() };
    // zero was remapped to 1, which is a very dark blue
    assert_eq!(px[0], r8g8b8a8_Srgb { r: 0, g: 0, b: 85, a: 255 });

    let img =
      decode_cel(&header(CCBPRE | BGND | NOBLK, pre0, 0, 2, 1), None, &data, &options).unwrap();
    let PixelData::Rgba(px) = &img.pixels else { panic!() };
    assert_eq!(px[0], r8g8b8a8_Srgb { r: 0, g: 0, b: 0, a: 255 });
  }

  #[test]
  fn test_uncoded_16bpp_pmode_bits() {
    let pre0 = (1 << 4) | 6;
    let mut data = vec![];
    data.extend_from_slice(&0xFC00_u16.to_be_bytes());
    data.extend_from_slice(&0x001F_u16.to_be_bytes());
    let img =
      decode_cel(&header(CCBPRE, pre0, 0, 2, 1), None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!(img.pmode_bits, Some(vec![true, false]));
    let PixelData::Rgba(px) = &img.pixels else { panic!() };
    assert_eq!(px[0], r8g8b8a8_Srgb { r: 255, g: 0, b: 0, a: 255 });
    assert_eq!(px[1], r8g8b8a8_Srgb { r: 0, g: 0, b: 255, a: 255 });
  }

  #[test]
  fn test_unpacked_stride_from_preamble() {
    // 4bpp, 2x2, rows 3 words apart
    let pre1 = (1 << 24) | 1;
    let mut data = vec![0_u8; 24];
    data[0] = 0x12;
    data[12] = 0x34;
    let img =
      decode_cel(&header(CCBPRE, (1 << 6) | 3, pre1, 0, 0), None, &data, &DecodeOptions::default())
        .unwrap();
    assert_eq!((img.width, img.height), (2, 2));
    assert_eq!(values(&img), &[1, 2, 3, 4]);
  }

  #[test]
  fn test_packed_width_is_measured() {
    let data = PackedCelBuilder::new(8)
      .row(&[Packet::Repeat(2, 1), Packet::Eol])
      .row(&[Packet::Repeat(4, 2), Packet::Eol])
      .finish();
    let h = header(CCBPRE | PACKED, (1 << 6) | 5, 0, 0, 0);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!((img.width, img.height), (4, 2));
    assert_eq!(values(&img), &[1, 1, 0, 0, 2, 2, 2, 2]);
  }

  #[test]
  fn test_truncation_is_marked() {
    let data = PackedCelBuilder::new(8).row(&[Packet::Literal(vec![1, 2, 3])]).finish();
    let h = header(CCBPRE | PACKED, (2 << 6) | 5, 0, 3, 0);
    let img = decode_cel(&h, None, &data[..5], &DecodeOptions::default()).unwrap();
    assert_eq!(img.height, 3);
    assert!(img.truncated);
  }

  #[test]
  fn test_packed_pixels_past_truncation_are_transparent() {
    let data = PackedCelBuilder::new(8).row(&[Packet::Literal(vec![1, 2, 3, 4])]).finish();
    let h = header(CCBPRE | PACKED, 5, 0, 4, 1);
    let img = decode_cel(&h, None, &data[..4], &DecodeOptions::default()).unwrap();
    assert!(img.truncated);
    assert_eq!(values(&img), &[1, 0, 0, 0]);
    assert_eq!(img.transparency, Some(vec![false, true, true, true]));
  }

  #[test]
  fn test_unpacked_pixels_past_truncation_are_transparent() {
    // coded 8bpp, one row of four, but only two bytes of data
    let data = [7, 8];
    let h = header(CCBPRE, 5, 3, 0, 0);
    let img = decode_cel(&h, None, &data, &DecodeOptions::default()).unwrap();
    assert_eq!((img.width, img.height), (4, 1));
    assert!(img.truncated);
    assert_eq!(values(&img), &[7, 8, 0, 0]);
    assert_eq!(img.transparency, Some(vec![false, false, true, true]));
  }

  #[test]
  fn test_fallback_palette_only_for_coded() {
    let options = DecodeOptions {
      fallback_palette: Some(Palette::grayscale(2).unwrap()),
      ..Default::default()
    };
    let data = PackedCelBuilder::new(8).row(&[Packet::Repeat(1, 1)]).finish();
    let img = decode_cel(&header(CCBPRE | PACKED, 5, 0, 1, 1), None, &data, &options).unwrap();
    assert!(img.palette.is_some());
    let img =
      decode_cel(&header(CCBPRE | PACKED, (1 << 4) | 5, 0, 1, 1), None, &data, &options).unwrap();
    assert!(img.palette.is_none());
  }
}
