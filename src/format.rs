#![forbid(unsafe_code)]

//! Works out how a cel's pixel data is laid out.
//!
//! Three things decide how the pixel bytes are read:
//! * **Coded or uncoded**: palette indexes, or direct color.
//! * **Packed or unpacked**: run-length packets with per-row offsets, or
//!   plain fixed-width rows.
//! * **Bits per pixel**: 1, 2, 4, 6, 8, or 16.
//!
//! Each of these can be stated in more than one place: the header's flag word,
//! a preamble at the front of the pixel data, or the header's own copy of the
//! preamble. The caller can also force any of them. [`resolve_precedence`] is
//! the one place where those sources get ranked.

use crate::{
  header::{CelHeader, Preamble0, Preamble1},
  util::u32_be_at,
  CelError, CelResult,
};

/// Width and height limit, per side.
pub const MAX_DIMENSION: u32 = 17_000;

/// The pixel layout of one cel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CelFormat {
  /// Values are palette indexes (rather than direct color).
  pub coded: bool,
  /// Rows are run-length packets (rather than raw values).
  pub packed: bool,
  /// Bits per stored pixel value.
  pub bits_per_pixel: u8,
}

/// Caller overrides for format detection. `None` means "detect it".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FormatOverrides {
  pub coded: Option<bool>,
  pub packed: Option<bool>,
  /// Must be one of 1, 2, 4, 6, 8, or 16.
  pub bits_per_pixel: Option<u8>,
  /// Used when neither the header nor the preamble gives a size.
  pub dimensions: Option<(u32, u32)>,
}

/// Picks the first source that has an opinion.
///
/// Sources are, highest rank first:
/// 1. The caller's override.
/// 2. The preamble stored alongside the pixel data, when the header says the
///    preamble lives there.
/// 3. The header's own preamble field.
#[inline]
#[must_use]
pub const fn resolve_precedence(
  explicit: Option<bool>, colocated: Option<bool>, header: Option<bool>,
) -> Option<bool> {
  match (explicit, colocated, header) {
    (Some(b), _, _) | (None, Some(b), _) | (None, None, Some(b)) => Some(b),
    (None, None, None) => None,
  }
}

/// Converts the 3-bit preamble code into bits per pixel.
///
/// Code 0 means "unspecified" and gives the default of 6.
#[inline]
pub const fn bpp_from_code(code: u8) -> CelResult<u8> {
  Ok(match code {
    0 => 6,
    1 => 1,
    2 => 2,
    3 => 4,
    4 => 6,
    5 => 8,
    6 => 16,
    _ => return Err(CelError::IllegalBitDepth),
  })
}

/// If a bits per pixel value is one the format allows.
#[inline]
#[must_use]
pub const fn is_legal_bpp(bpp: u8) -> bool {
  matches!(bpp, 1 | 2 | 4 | 6 | 8 | 16)
}

/// Everything needed to start reading a cel's pixel rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedFormat {
  pub format: CelFormat,
  /// `None` only for packed data with no declared width. The packet decoder
  /// measures it.
  pub width: Option<u32>,
  pub height: u32,
  /// Words per row for unpacked data, when a second preamble word gave it.
  pub row_stride_words: Option<u32>,
  /// Byte offset of the first row within the pixel data chunk (skips an
  /// in-data preamble).
  pub data_offset: usize,
}

/// Resolves the format and dimensions of a cel.
///
/// * `pixel_data` is the payload of the pixel data chunk, which might begin
///   with a preamble.
///
/// ## Failure
/// * [`CelError::IllegalBitDepth`] for preamble code 7 or an illegal override.
/// * [`CelError::UnknownDimensions`] for unpacked data with no size.
/// * [`CelError::WidthOrHeightZero`] / [`CelError::DimensionsTooLarge`].
pub fn detect_format(
  header: &CelHeader, pixel_data: &[u8], overrides: &FormatOverrides,
) -> CelResult<ResolvedFormat> {
  // packedness is only ever stated in the flag word
  let packed = overrides.packed.unwrap_or(header.flags.packed);

  // the colocated preamble is one word for packed data and two for unpacked
  let in_data = !header.flags.preamble_in_header;
  let data_pre0 = if in_data { u32_be_at(pixel_data, 0).map(Preamble0::from) } else { None };
  let data_pre1 =
    if in_data && !packed { u32_be_at(pixel_data, 4).map(Preamble1::from) } else { None };
  let header_pre0 = Some(header.pre0).filter(|p| p.raw != 0 || !in_data);
  let header_pre1 = if packed { None } else { Some(header.pre1).filter(|p| p.raw != 0) };
  let pre0 = data_pre0.or(header_pre0);
  let pre1 = data_pre1.or(header_pre1);

  let uncoded = resolve_precedence(
    overrides.coded.map(|c| !c),
    data_pre0.map(|p| p.uncoded),
    header_pre0.map(|p| p.uncoded),
  );
  let coded = !uncoded.unwrap_or(false);

  let bits_per_pixel = match overrides.bits_per_pixel {
    Some(bpp) if is_legal_bpp(bpp) => bpp,
    Some(_) => return Err(CelError::IllegalBitDepth),
    None => bpp_from_code(pre0.map(|p| p.bpp_code).unwrap_or(0))?,
  };

  let data_offset = match (in_data, packed) {
    (false, _) => 0,
    (true, true) => 4,
    (true, false) => 8,
  };

  // The header's own size wins when it's non-zero. A preamble word of exactly
  // zero is treated as absent when looking for dimensions.
  let pick = |declared: u32, from_pre: Option<u32>, external: Option<u32>| {
    Some(declared).filter(|d| *d != 0).or(from_pre).or(external)
  };
  let height = pick(
    header.height,
    pre0.filter(|p| p.raw != 0).map(Preamble0::height),
    overrides.dimensions.map(|d| d.1),
  );
  let width = pick(
    header.width,
    if packed { None } else { pre1.map(Preamble1::width) },
    overrides.dimensions.map(|d| d.0),
  );

  let (width, height) = match (width, height) {
    (Some(w), Some(h)) => (Some(w), h),
    (None, Some(h)) if packed => (None, h),
    _ => {
      if packed {
        log::warn!("packed cel has no known height");
      } else {
        log::warn!("unpacked cel has no known width and height");
      }
      return Err(CelError::UnknownDimensions);
    }
  };
  if height == 0 || width == Some(0) {
    return Err(CelError::WidthOrHeightZero);
  }
  if height > MAX_DIMENSION || width.unwrap_or(0) > MAX_DIMENSION {
    return Err(CelError::DimensionsTooLarge);
  }

  let row_stride_words =
    if packed { None } else { pre1.map(|p| p.row_stride_words(bits_per_pixel)) };

  let resolved = ResolvedFormat {
    format: CelFormat { coded, packed, bits_per_pixel },
    width,
    height,
    row_stride_words,
    data_offset,
  };
  log::trace!("resolved cel format: {resolved:?}");
  Ok(resolved)
}
