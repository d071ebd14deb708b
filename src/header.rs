#![forbid(unsafe_code)]

//! The cel control block (`CCB `) header chunk.
//!
//! The header is a fixed run of big-endian words. The interesting part is the
//! `flags` word, which packs about thirty single-bit and small multi-bit
//! fields, plus the two preamble words which describe the pixel data. All of
//! it is split into named fields once, when the header is parsed.

use bitfrob::{u32_get_bit, u32_get_value};
use pack1::U32BE;

use crate::{util::try_pull_pod, CelError, CelResult};

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub(crate) struct RawCcbHeader {
  pub version: U32BE,
  pub flags: U32BE,
  pub next_ptr: U32BE,
  pub source_ptr: U32BE,
  pub palette_ptr: U32BE,
  pub x_pos: U32BE,
  pub y_pos: U32BE,
  pub hdx: U32BE,
  pub hdy: U32BE,
  pub vdx: U32BE,
  pub vdy: U32BE,
  pub hddx: U32BE,
  pub hddy: U32BE,
  pub ppmp: U32BE,
  pub pre0: U32BE,
  pub pre1: U32BE,
  pub width: U32BE,
  pub height: U32BE,
}

/// Full size of the header chunk payload.
pub const CCB_PAYLOAD_LEN: usize = core::mem::size_of::<RawCcbHeader>();

/// Older headers stop after the second preamble word, with no width and
/// height. Anything shorter than this is an error.
pub const CCB_MIN_PAYLOAD_LEN: usize = CCB_PAYLOAD_LEN - 8;

/// How the blend stage picks which of the two P-modes to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PModeSelect {
  /// Each pixel's own P-mode bit picks the mode.
  PerPixel,
  /// Always use mode 0 (the low half of the control word).
  Force0,
  /// Always use mode 1 (the high half of the control word).
  Force1,
}
impl From<u32> for PModeSelect {
  /// Only the low two bits matter. The value 1 is reserved by the hardware,
  /// and it's treated like 0.
  #[inline]
  fn from(value: u32) -> Self {
    match value & 0b11 {
      2 => Self::Force0,
      3 => Self::Force1,
      _ => Self::PerPixel,
    }
  }
}

/// The header's primary flag word, split into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct CcbFlags {
  /// The original word.
  pub raw: u32,
  /// Don't draw this cel.
  pub skip: bool,
  /// Last cel in a linked list.
  pub last: bool,
  pub next_absolute: bool,
  pub source_absolute: bool,
  pub palette_absolute: bool,
  pub load_size: bool,
  pub load_perspective: bool,
  /// The header's blend control word should be used.
  pub load_pixel_control: bool,
  pub load_palette: bool,
  /// The preamble words are in this header. When this is clear, the preamble
  /// sits at the front of the pixel data instead.
  pub preamble_in_header: bool,
  pub y_ox_y: bool,
  pub super_clip: bool,
  pub line_super_clip: bool,
  /// Render clockwise facing cels.
  pub clockwise: bool,
  /// Render counter-clockwise facing cels.
  pub counter_clockwise: bool,
  pub terminate_wrong_direction: bool,
  pub lock_corner_engines: bool,
  pub corner_engine_a: bool,
  pub maria: bool,
  pub pixel_xor: bool,
  pub use_av: bool,
  /// The pixel data is packed into run-length packets.
  pub packed: bool,
  pub pmode_select: PModeSelect,
  pub palette_position: bool,
  /// Zero and black pixels are drawn instead of being transparent.
  pub background_pass: bool,
  /// Raw zero pixels are drawn as zero rather than being remapped to 1.
  pub no_black: bool,
  /// Bits prefixed onto coded pixel values of less than 5 bits.
  pub palette_extension: u8,
}
impl From<u32> for CcbFlags {
  #[inline]
  fn from(raw: u32) -> Self {
    Self {
      raw,
      skip: u32_get_bit(31, raw),
      last: u32_get_bit(30, raw),
      next_absolute: u32_get_bit(29, raw),
      source_absolute: u32_get_bit(28, raw),
      palette_absolute: u32_get_bit(27, raw),
      load_size: u32_get_bit(26, raw),
      load_perspective: u32_get_bit(25, raw),
      load_pixel_control: u32_get_bit(24, raw),
      load_palette: u32_get_bit(23, raw),
      preamble_in_header: u32_get_bit(22, raw),
      y_ox_y: u32_get_bit(21, raw),
      super_clip: u32_get_bit(20, raw),
      line_super_clip: u32_get_bit(19, raw),
      clockwise: u32_get_bit(18, raw),
      counter_clockwise: u32_get_bit(17, raw),
      terminate_wrong_direction: u32_get_bit(16, raw),
      lock_corner_engines: u32_get_bit(15, raw),
      corner_engine_a: u32_get_bit(14, raw),
      maria: u32_get_bit(12, raw),
      pixel_xor: u32_get_bit(11, raw),
      use_av: u32_get_bit(10, raw),
      packed: u32_get_bit(9, raw),
      pmode_select: PModeSelect::from(u32_get_value(7, 8, raw)),
      palette_position: u32_get_bit(6, raw),
      background_pass: u32_get_bit(5, raw),
      no_black: u32_get_bit(4, raw),
      palette_extension: u32_get_value(0, 3, raw) as u8,
    }
  }
}

/// The first preamble word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Preamble0 {
  /// The original word.
  pub raw: u32,
  /// Image height minus one.
  pub vertical_count: u16,
  /// Pixel values are direct color rather than palette indexes.
  pub uncoded: bool,
  /// Replicate 8-bit uncoded values (not used by the decoder).
  pub rep8: bool,
  /// The 3-bit bits-per-pixel code.
  pub bpp_code: u8,
}
impl From<u32> for Preamble0 {
  #[inline]
  fn from(raw: u32) -> Self {
    Self {
      raw,
      vertical_count: u32_get_value(6, 15, raw) as u16,
      uncoded: u32_get_bit(4, raw),
      rep8: u32_get_bit(3, raw),
      bpp_code: u32_get_value(0, 2, raw) as u8,
    }
  }
}
impl Preamble0 {
  /// The height this preamble declares.
  #[inline]
  #[must_use]
  pub const fn height(self) -> u32 {
    self.vertical_count as u32 + 1
  }
}

/// The second preamble word, only present for unpacked pixel data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Preamble1 {
  /// The original word.
  pub raw: u32,
  /// Words per row minus two, for bit depths below 8.
  pub word_offset8: u16,
  /// Words per row minus two, for 8 and 16 bit depths.
  pub word_offset10: u16,
  pub no_swap: bool,
  /// Rows are stored in pairs, left/right form.
  pub lr_form: bool,
  /// Image width minus one.
  pub horizontal_count: u16,
}
impl From<u32> for Preamble1 {
  #[inline]
  fn from(raw: u32) -> Self {
    Self {
      raw,
      word_offset8: u32_get_value(24, 31, raw) as u16,
      word_offset10: u32_get_value(16, 25, raw) as u16,
      no_swap: u32_get_bit(14, raw),
      lr_form: u32_get_bit(11, raw),
      horizontal_count: u32_get_value(0, 10, raw) as u16,
    }
  }
}
impl Preamble1 {
  /// The width this preamble declares.
  #[inline]
  #[must_use]
  pub const fn width(self) -> u32 {
    self.horizontal_count as u32 + 1
  }

  /// Words from the start of one row to the start of the next.
  #[inline]
  #[must_use]
  pub const fn row_stride_words(self, bits_per_pixel: u8) -> u32 {
    let offset = if bits_per_pixel >= 8 { self.word_offset10 } else { self.word_offset8 };
    offset as u32 + 2
  }
}

/// A parsed `CCB ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct CelHeader {
  pub version: u32,
  pub flags: CcbFlags,
  pub next_ptr: u32,
  pub source_ptr: u32,
  pub palette_ptr: u32,
  /// 16.16 fixed point.
  pub x_pos: i32,
  /// 16.16 fixed point.
  pub y_pos: i32,
  pub hdx: i32,
  pub hdy: i32,
  pub vdx: i32,
  pub vdy: i32,
  pub hddx: i32,
  pub hddy: i32,
  /// The raw blend control word, see [`blend_control`](Self::blend_control).
  pub ppmp: u32,
  pub pre0: Preamble0,
  pub pre1: Preamble1,
  /// Declared width, 0 if the header doesn't say.
  pub width: u32,
  /// Declared height, 0 if the header doesn't say.
  pub height: u32,
}
impl From<RawCcbHeader> for CelHeader {
  #[inline]
  fn from(r: RawCcbHeader) -> Self {
    Self {
      version: r.version.get(),
      flags: CcbFlags::from(r.flags.get()),
      next_ptr: r.next_ptr.get(),
      source_ptr: r.source_ptr.get(),
      palette_ptr: r.palette_ptr.get(),
      x_pos: r.x_pos.get() as i32,
      y_pos: r.y_pos.get() as i32,
      hdx: r.hdx.get() as i32,
      hdy: r.hdy.get() as i32,
      vdx: r.vdx.get() as i32,
      vdy: r.vdy.get() as i32,
      hddx: r.hddx.get() as i32,
      hddy: r.hddy.get() as i32,
      ppmp: r.ppmp.get(),
      pre0: Preamble0::from(r.pre0.get()),
      pre1: Preamble1::from(r.pre1.get()),
      width: r.width.get(),
      height: r.height.get(),
    }
  }
}
impl CelHeader {
  /// Parses the payload of a `CCB ` chunk (the bytes after the tag and size).
  ///
  /// Payloads that end after the second preamble word are accepted, and the
  /// width and height are then 0.
  ///
  /// ## Failure
  /// * [`CelError::InsufficientBytes`] if the payload is shorter than
  ///   [`CCB_MIN_PAYLOAD_LEN`].
  pub fn try_from_payload(payload: &[u8]) -> CelResult<Self> {
    if payload.len() < CCB_MIN_PAYLOAD_LEN {
      return Err(CelError::InsufficientBytes);
    }
    let mut full = [0_u8; CCB_PAYLOAD_LEN];
    let have = payload.len().min(CCB_PAYLOAD_LEN);
    full[..have].copy_from_slice(&payload[..have]);
    let (raw, _) = try_pull_pod::<RawCcbHeader>(&full)?;
    Ok(Self::from(raw))
  }

  /// The blend control word, if the header says to load it.
  #[inline]
  #[must_use]
  pub const fn blend_control(&self) -> Option<u32> {
    if self.flags.load_pixel_control {
      Some(self.ppmp)
    } else {
      None
    }
  }
}
