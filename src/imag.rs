#![forbid(unsafe_code)]

//! Static images with an `IMAG` header chunk instead of a cel header.

use pack1::U32BE;

use crate::{
  decode::{decode_rows, DecodeOptions, DecodedImage, RowLayout},
  format::{is_legal_bpp, resolve_precedence, CelFormat, MAX_DIMENSION},
  header::CcbFlags,
  palette::Palette,
  reorder::{HalfResolution, PixelOrder},
  util::try_pull_pod,
  CelError, CelResult,
};

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
struct RawImagHeader {
  width: U32BE,
  height: U32BE,
  bytes_per_row: U32BE,
  bits_per_pixel: u8,
  components: u8,
  planes: u8,
  color_space: u8,
  compression: u8,
  hv_format: u8,
  pixel_order: u8,
  version: u8,
}

/// How the pixel data of an `IMAG` is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagCompression {
  Raw,
  /// The same packets packed cels use.
  Packetized,
  Other(u8),
}
impl From<u8> for ImagCompression {
  #[inline]
  fn from(value: u8) -> Self {
    match value {
      0 => Self::Raw,
      1 => Self::Packetized,
      other => Self::Other(other),
    }
  }
}

/// A parsed `IMAG` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct ImagHeader {
  /// Full width, after any half-resolution expansion.
  pub width: u32,
  /// Full height, after any half-resolution expansion.
  pub height: u32,
  /// Row stride of raw data, or 0 for tightly packed rows.
  pub bytes_per_row: u32,
  pub bits_per_pixel: u8,
  /// 1 for palette indexes, 3 for direct color.
  pub components: u8,
  pub planes: u8,
  pub color_space: u8,
  pub compression: ImagCompression,
  pub half_resolution: HalfResolution,
  pub pixel_order: PixelOrder,
  pub version: u8,
}
impl From<RawImagHeader> for ImagHeader {
  #[inline]
  fn from(r: RawImagHeader) -> Self {
    Self {
      width: r.width.get(),
      height: r.height.get(),
      bytes_per_row: r.bytes_per_row.get(),
      bits_per_pixel: r.bits_per_pixel,
      components: r.components,
      planes: r.planes,
      color_space: r.color_space,
      compression: ImagCompression::from(r.compression),
      half_resolution: HalfResolution::from(r.hv_format),
      pixel_order: PixelOrder::from(r.pixel_order),
      version: r.version,
    }
  }
}
impl ImagHeader {
  /// Parses the payload of an `IMAG` chunk.
  pub fn try_from_payload(payload: &[u8]) -> CelResult<Self> {
    let (raw, _) = try_pull_pod::<RawImagHeader>(payload)?;
    Ok(Self::from(raw))
  }

  /// The size the pixel data is actually stored at.
  #[inline]
  #[must_use]
  pub const fn stored_dimensions(&self) -> (u32, u32) {
    self.half_resolution.stored_dimensions(self.width, self.height)
  }
}

/// Static images draw every pixel: zero values aren't transparent and
/// aren't remapped.
const IMAG_FLAGS: u32 = (1 << 5) | (1 << 4);

/// Decodes an image with an `IMAG` header.
///
/// The pixels are decoded at the stored size, put into display order, then
/// stretched to the full size.
pub fn decode_imag(
  header: &ImagHeader, palette: Option<&Palette>, pixel_data: &[u8], options: &DecodeOptions,
) -> CelResult<DecodedImage> {
  if header.width == 0 || header.height == 0 {
    return Err(CelError::WidthOrHeightZero);
  }
  if header.width > MAX_DIMENSION || header.height > MAX_DIMENSION {
    return Err(CelError::DimensionsTooLarge);
  }
  let o = &options.overrides;
  let coded = resolve_precedence(o.coded, None, Some(header.components == 1)).unwrap_or(true);
  let packed = o.packed.unwrap_or_else(|| match header.compression {
    ImagCompression::Raw => false,
    ImagCompression::Packetized => true,
    ImagCompression::Other(c) => {
      log::warn!("unknown image compression {c}, reading the data as raw");
      false
    }
  });
  let bits_per_pixel = o.bits_per_pixel.unwrap_or(header.bits_per_pixel);
  if !is_legal_bpp(bits_per_pixel) {
    return Err(CelError::IllegalBitDepth);
  }
  let format = CelFormat { coded, packed, bits_per_pixel };

  let (stored_w, stored_h) = header.stored_dimensions();
  let layout = if packed {
    RowLayout::Packed
  } else if header.bytes_per_row != 0 {
    RowLayout::Unpacked { stride_bits: header.bytes_per_row as usize * 8 }
  } else {
    RowLayout::Unpacked { stride_bits: stored_w as usize * usize::from(bits_per_pixel) }
  };
  log::trace!("image: {header:?}, stored at {stored_w}x{stored_h}");

  let flags = CcbFlags::from(IMAG_FLAGS);
  let mut image = decode_rows(pixel_data, format, stored_w, stored_h, layout, flags)?
    .reordered(header.pixel_order)?
    .upscaled(header.width, header.height)?;
  if coded {
    image.palette = palette.cloned().or_else(|| options.fallback_palette.clone());
  }
  Ok(image)
}
