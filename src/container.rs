#![forbid(unsafe_code)]

//! Splits a file into decode units and decodes each of them.
//!
//! A decode unit is a pixel data chunk plus the header and palette that go
//! with it. The header is the nearest header chunk before the pixel data (or
//! the first one in the file, for animations that share a header). Which
//! palette goes with which pixel data is a heuristic, so it's behind the
//! [`PaletteAssociation`] trait.
//!
//! One unit failing to decode never stops the rest. Failures are logged and
//! listed in the [`DecodeReport`].

use alloc::vec::Vec;

use crate::{
  chunk::{ChunkTag, RawChunk, RawChunkIter},
  decode::{decode_cel, DecodeOptions, DecodedImage},
  header::CelHeader,
  palette::Palette,
  CelError, CelResult,
};

#[cfg(feature = "anim")]
use crate::{anim::AnimHeader, chunk::CHUNK_HEAD_LEN};

/// Picks the palette chunk for a unit.
pub trait PaletteAssociation {
  /// * `chunks` is every known chunk of the file, in order.
  /// * `header` is the index of the unit's header chunk.
  /// * `pixels` is the index of the unit's pixel data chunk.
  ///
  /// Returns the index of a palette chunk, if any.
  fn palette_for(&self, chunks: &[RawChunk<'_>], header: usize, pixels: usize) -> Option<usize>;
}

/// The nearest palette chunk to the pixel data.
///
/// First looks forward from the pixel data, up to the next header or pixel
/// data chunk. Then looks backward, giving up at any header other than the
/// unit's own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NearestPalette;
impl PaletteAssociation for NearestPalette {
  fn palette_for(&self, chunks: &[RawChunk<'_>], header: usize, pixels: usize) -> Option<usize> {
    for (i, c) in chunks.iter().enumerate().skip(pixels + 1) {
      match c.tag {
        ChunkTag::PLUT => return Some(i),
        t if is_header_tag(t) || t == ChunkTag::PDAT => break,
        _ => (),
      }
    }
    for i in (0..pixels.min(chunks.len())).rev() {
      match chunks[i].tag {
        ChunkTag::PLUT => return Some(i),
        t if is_header_tag(t) && i != header => break,
        _ => (),
      }
    }
    None
  }
}

/// Only a palette chunk between the unit's header and its pixel data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StrictOrder;
impl PaletteAssociation for StrictOrder {
  fn palette_for(&self, chunks: &[RawChunk<'_>], header: usize, pixels: usize) -> Option<usize> {
    if header >= pixels {
      return None;
    }
    (header + 1..pixels.min(chunks.len())).rev().find(|i| chunks[*i].tag == ChunkTag::PLUT)
  }
}

#[inline]
fn is_header_tag(tag: ChunkTag) -> bool {
  tag == ChunkTag::CCB || (cfg!(feature = "imag") && tag == ChunkTag::IMAG)
}

/// A decode unit that didn't decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFailure {
  /// Offset of the unit's pixel data chunk in the file.
  pub chunk_offset: usize,
  pub error: CelError,
}

/// How a container decode went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
  /// Units that produced an image.
  pub decoded: usize,
  pub failures: Vec<UnitFailure>,
}
impl DecodeReport {
  #[inline]
  #[must_use]
  pub fn failed(&self) -> usize {
    self.failures.len()
  }

  /// If every unit decoded.
  #[inline]
  #[must_use]
  pub fn is_clean(&self) -> bool {
    self.failures.is_empty()
  }
}

/// The known chunks of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerScan<'b> {
  /// Header, palette, and pixel data chunks in file order. Unknown chunks
  /// are left out.
  pub chunks: Vec<RawChunk<'b>>,
  /// The first animation wrapper in the file.
  #[cfg(feature = "anim")]
  pub anim: Option<AnimHeader>,
}

/// Finds all the chunks of a file.
///
/// Unknown chunks are skipped by their size. An animation wrapper is parsed
/// on the spot, and the scan continues after its loop table or its declared
/// end, whichever is later.
pub fn scan_chunks(bytes: &[u8]) -> CelResult<ContainerScan<'_>> {
  let mut scan = ContainerScan::default();
  let mut iter = RawChunkIter::new(bytes);
  while let Some(c) = iter.next() {
    match c.tag {
      ChunkTag::CCB | ChunkTag::PLUT | ChunkTag::PDAT => (),
      #[cfg(feature = "imag")]
      ChunkTag::IMAG => (),
      #[cfg(feature = "anim")]
      ChunkTag::ANIM => {
        match AnimHeader::try_from_payload(c.data) {
          Ok(anim) => {
            let table_end = c.offset.saturating_add(CHUNK_HEAD_LEN + anim.loop_table_len());
            iter.resume_at(c.declared_end().max(table_end));
            if scan.anim.is_none() {
              scan.anim = Some(anim);
            } else {
              log::warn!("ignoring extra animation wrapper at {}", c.offset);
            }
          }
          Err(e) => log::warn!("bad animation wrapper at {}: {e}", c.offset),
        }
        continue;
      }
      other => {
        log::info!("skipping unknown chunk {other:?} at {}", c.offset);
        continue;
      }
    }
    scan.chunks.try_reserve(1)?;
    scan.chunks.push(c);
  }
  log::debug!("found {} chunks", scan.chunks.len());
  Ok(scan)
}

/// All the images of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct CelFile {
  pub images: Vec<DecodedImage>,
  pub report: DecodeReport,
}

/// Decodes every unit of a file, using [`NearestPalette`].
///
/// ## Failure
/// Only when an allocation for the whole file fails. Errors in single units
/// are in the report instead.
pub fn decode_cel_file(bytes: &[u8], options: &DecodeOptions) -> CelResult<CelFile> {
  decode_cel_file_with(bytes, options, &NearestPalette)
}

/// Decodes every unit of a file with the given palette association.
pub fn decode_cel_file_with(
  bytes: &[u8], options: &DecodeOptions, association: &dyn PaletteAssociation,
) -> CelResult<CelFile> {
  let scan = scan_chunks(bytes)?;
  #[cfg(feature = "anim")]
  let shared = scan.anim.as_ref().map_or(false, AnimHeader::shares_header);
  #[cfg(not(feature = "anim"))]
  let shared = false;
  let (images, report) = decode_units(&scan.chunks, shared, options, association)?;
  Ok(CelFile { images, report })
}

/// Decodes every pixel data chunk in `chunks`.
///
/// With `shared_header` every unit uses the first header chunk, as long as
/// that header comes before it.
pub(crate) fn decode_units(
  chunks: &[RawChunk<'_>], shared_header: bool, options: &DecodeOptions,
  association: &dyn PaletteAssociation,
) -> CelResult<(Vec<DecodedImage>, DecodeReport)> {
  let unit_count = chunks.iter().filter(|c| c.tag == ChunkTag::PDAT).count();
  let mut images = Vec::new();
  images.try_reserve(unit_count)?;
  let mut report = DecodeReport::default();

  let first_header = chunks.iter().position(|c| is_header_tag(c.tag));
  let mut last_header = None;
  for (i, c) in chunks.iter().enumerate() {
    if is_header_tag(c.tag) {
      last_header = Some(i);
      continue;
    }
    if c.tag != ChunkTag::PDAT {
      continue;
    }
    let header = if shared_header { first_header.filter(|h| *h < i) } else { last_header };
    let result = match header {
      Some(h) => decode_unit(chunks, h, i, options, association),
      None => {
        log::warn!("pixel data at {} has no header before it, skipping", c.offset);
        Err(CelError::MissingHeader)
      }
    };
    match result {
      Ok(image) => {
        images.push(image);
        report.decoded += 1;
      }
      Err(error) => {
        if error != CelError::MissingHeader {
          log::warn!("pixel data at {} failed to decode: {error}", c.offset);
        }
        report.failures.try_reserve(1)?;
        report.failures.push(UnitFailure { chunk_offset: c.offset, error });
      }
    }
  }
  if !report.is_clean() {
    log::warn!("{} of {} units failed to decode", report.failed(), unit_count);
  }
  Ok((images, report))
}

fn decode_unit(
  chunks: &[RawChunk<'_>], header: usize, pixels: usize, options: &DecodeOptions,
  association: &dyn PaletteAssociation,
) -> CelResult<DecodedImage> {
  let palette = association.palette_for(chunks, header, pixels).and_then(|p| {
    match Palette::from_plut_payload(chunks[p].data, options.palette_encoding) {
      Ok(palette) => Some(palette),
      Err(e) => {
        log::warn!("palette at {} is unusable: {e}", chunks[p].offset);
        None
      }
    }
  });
  let head = &chunks[header];
  let data = chunks[pixels].data;
  match head.tag {
    #[cfg(feature = "imag")]
    ChunkTag::IMAG => {
      let imag = crate::imag::ImagHeader::try_from_payload(head.data)?;
      crate::imag::decode_imag(&imag, palette.as_ref(), data, options)
    }
    _ => {
      let cel = CelHeader::try_from_payload(head.data)?;
      decode_cel(&cel, palette.as_ref(), data, options)
    }
  }
}
